//! Node capability
//!
//! Components attach to nodes. The engine only needs to know whether a node
//! is present and which emitter carries its events; everything else about a
//! node belongs to the host.

use std::fmt;
use std::sync::Arc;
use void_event::Emitter;

/// A target a component can be attached to
pub trait Node: Send + Sync {
    /// An empty selection cannot host a component
    fn is_empty(&self) -> bool {
        false
    }

    /// Emitter carrying this node's events
    fn emitter(&self) -> Emitter;

    /// Human-readable description for logs
    fn label(&self) -> String;
}

/// Shared handle to a node. Two handles are the same node when they point at
/// the same allocation.
#[derive(Clone)]
pub struct NodeRef(Arc<dyn Node>);

impl NodeRef {
    pub fn new<N: Node + 'static>(node: N) -> Self {
        Self(Arc::new(node))
    }

    pub fn from_arc(node: Arc<dyn Node>) -> Self {
        Self(node)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn emitter(&self) -> Emitter {
        self.0.emitter()
    }

    pub fn label(&self) -> String {
        self.0.label()
    }

    /// Identity comparison
    pub fn same(&self, other: &NodeRef) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.label()).finish()
    }
}

/// In-memory element with its own emitter
pub struct ElementNode {
    tag: String,
    emitter: Emitter,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            emitter: Emitter::new(),
        }
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> NodeRef {
        NodeRef::new(self)
    }
}

impl Node for ElementNode {
    fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    fn label(&self) -> String {
        format!("<{}>", self.tag)
    }
}

/// A selection that matched nothing
#[derive(Default)]
pub struct EmptyNode {
    emitter: Emitter,
}

impl Node for EmptyNode {
    fn is_empty(&self) -> bool {
        true
    }

    fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    fn label(&self) -> String {
        "<empty>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_identity() {
        let body = ElementNode::new("body").into_ref();
        let same = body.clone();
        let other = ElementNode::new("body").into_ref();

        assert!(body.same(&same));
        assert!(!body.same(&other));
        assert!(body.emitter().same(&same.emitter()));
        assert_eq!(body.label(), "<body>");
    }

    #[test]
    fn test_empty_node() {
        let empty = NodeRef::new(EmptyNode::default());
        assert!(empty.is_empty());
        assert!(!ElementNode::new("div").into_ref().is_empty());
    }

    #[test]
    fn test_from_arc_keeps_identity() {
        let shared: Arc<dyn Node> = Arc::new(ElementNode::new("span"));
        let a = NodeRef::from_arc(Arc::clone(&shared));
        let b = NodeRef::from_arc(shared);

        assert!(a.same(&b));
        assert!(a.emitter().same(&b.emitter()));
        assert_eq!(a.label(), "<span>");
    }
}
