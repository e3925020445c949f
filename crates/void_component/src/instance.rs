//! Component instances
//!
//! An instance is constructed cheaply from its definition and becomes live
//! through [`Instance::initialize`], which validates the node and the
//! required attributes before anything is registered.
//!
//! Teardown is idempotent: the first call marks the instance torn down
//! before running any hook, so a cascade that reaches the same instance
//! again is a no-op.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Deserialize};
use serde_json::Value;
use void_event::{Emitter, EventId, Handler, SubscriptionId};

use crate::attributes::Attributes;
use crate::config::EventAction;
use crate::definition::{Blueprint, Definition, DefinitionInner};
use crate::error::{ComponentError, ComponentResult};
use crate::mixin::Hook;
use crate::node::NodeRef;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique instance identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// Instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    /// Constructed, not yet attached
    Constructed,
    /// Attached and registered
    Initialized,
    /// Torn down; terminal
    TornDown,
}

impl InstanceState {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Initialized)
    }
}

/// What initialize binds
struct Binding {
    node: NodeRef,
    emitter: Emitter,
    attrs: Arc<Attributes>,
}

struct InstanceInner {
    id: InstanceId,
    blueprint: Arc<Blueprint>,
    definition: Weak<DefinitionInner>,
    state: Mutex<InstanceState>,
    binding: RwLock<Option<Binding>>,
    subscriptions: Mutex<Vec<(EventId, SubscriptionId)>>,
    fields: RwLock<BTreeMap<String, Value>>,
    teardown_hooks: Mutex<Vec<Hook>>,
}

/// Handle to a component instance
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

impl Instance {
    pub(crate) fn construct(blueprint: Arc<Blueprint>, definition: Weak<DefinitionInner>) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                id: InstanceId::next(),
                blueprint,
                definition,
                state: Mutex::new(InstanceState::Constructed),
                binding: RwLock::new(None),
                subscriptions: Mutex::new(Vec::new()),
                fields: RwLock::new(BTreeMap::new()),
                teardown_hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn state(&self) -> InstanceState {
        *self.inner.state.lock()
    }

    /// Name of the definition's base source
    pub fn definition_name(&self) -> &str {
        self.inner.blueprint.name()
    }

    /// Owning definition, if it still exists
    pub fn definition(&self) -> Option<Definition> {
        self.inner.definition.upgrade().map(Definition::from_inner)
    }

    /// Attach to `node` with caller attributes overlaid on the defaults.
    ///
    /// Fails without side effects when the instance is not fresh, the node is
    /// missing or empty, or a required attribute stays unresolved.
    pub fn initialize(&self, node: Option<NodeRef>, attrs: Attributes) -> ComponentResult<Instance> {
        let blueprint = &self.inner.blueprint;

        let state = self.state();
        if state != InstanceState::Constructed {
            return Err(ComponentError::InvalidState {
                component: blueprint.name().to_string(),
                state,
            });
        }

        let node = match node {
            Some(node) if !node.is_empty() => node,
            _ => return Err(ComponentError::MissingNode),
        };

        let resolved = blueprint.defaults.resolve(&attrs);
        if let Some(name) = blueprint.defaults.first_unresolved(&resolved) {
            return Err(ComponentError::MissingRequiredAttribute {
                name: name.to_string(),
                component: blueprint.name().to_string(),
            });
        }

        let definition = self.inner.definition.upgrade().ok_or_else(|| {
            ComponentError::DefinitionDropped {
                component: blueprint.name().to_string(),
            }
        })?;

        {
            let mut state = self.inner.state.lock();
            if *state != InstanceState::Constructed {
                return Err(ComponentError::InvalidState {
                    component: blueprint.name().to_string(),
                    state: *state,
                });
            }
            *state = InstanceState::Initialized;
        }

        log::debug!("{} of '{}' attached to {}", self.id(), blueprint.name(), node.label());

        *self.inner.binding.write() = Some(Binding {
            emitter: node.emitter(),
            node,
            attrs: Arc::new(resolved),
        });

        definition.live.lock().insert(self.clone());

        for hook in &blueprint.hooks.after_initialize {
            hook(self);
        }

        Ok(self.clone())
    }

    /// Tear the instance down. Returns false if it was not live.
    ///
    /// Subscriptions and the registry entry are released even if a hook
    /// panics. The binding and this instance's own hooks are dropped once
    /// teardown completes.
    pub fn teardown(&self) -> bool {
        {
            let mut state = self.inner.state.lock();
            if *state != InstanceState::Initialized {
                return false;
            }
            *state = InstanceState::TornDown;
        }

        let mut release = Release::new(self);

        let instance_hooks = std::mem::take(&mut *self.inner.teardown_hooks.lock());
        for hook in &instance_hooks {
            hook(self);
        }
        drop(instance_hooks);
        for hook in &self.inner.blueprint.hooks.before_teardown {
            hook(self);
        }

        release.run();

        for hook in &self.inner.blueprint.hooks.after_teardown {
            hook(self);
        }

        self.inner.binding.write().take();
        log::debug!("{} of '{}' torn down", self.id(), self.definition_name());
        true
    }

    fn deregister(&self) {
        if let Some(definition) = self.inner.definition.upgrade() {
            definition.live.lock().remove(self.id());
        }
    }

    /// Whether the owning definition currently tracks this instance
    pub fn is_registered(&self) -> bool {
        match self.inner.definition.upgrade() {
            Some(definition) => {
                let registered = definition.live.lock().contains(self.id());
                registered
            }
            None => false,
        }
    }

    /// Register a hook that runs first when this instance is torn down
    pub fn before_teardown<F>(&self, hook: F)
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        if self.state() == InstanceState::TornDown {
            return;
        }
        self.inner.teardown_hooks.lock().push(Arc::new(hook));
    }

    /// Resolved attributes. Empty outside the live window.
    pub fn attr(&self) -> Arc<Attributes> {
        self.inner
            .binding
            .read()
            .as_ref()
            .map(|binding| Arc::clone(&binding.attrs))
            .unwrap_or_default()
    }

    pub fn attr_value(&self, name: &str) -> Option<Value> {
        self.inner
            .binding
            .read()
            .as_ref()
            .and_then(|binding| binding.attrs.get(name).cloned())
    }

    /// Bound node. None outside the live window.
    pub fn node(&self) -> Option<NodeRef> {
        self.inner
            .binding
            .read()
            .as_ref()
            .map(|binding| binding.node.clone())
    }

    /// Own field, falling back to the prototype
    pub fn field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.inner.fields.read().get(name) {
            return Some(value.clone());
        }
        self.inner.blueprint.prototype.get(name).cloned()
    }

    /// Set an own field, shadowing the prototype
    pub fn set_field(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner.fields.write().insert(name.into(), value.into());
    }

    /// Subscribe to an event on the bound node
    pub fn on(&self, event: impl Into<EventId>, handler: Handler) -> ComponentResult<SubscriptionId> {
        if !self.state().is_live() {
            return Err(self.not_initialized("on"));
        }
        let emitter = self.emitter("on")?;
        let event = event.into();

        self.log_event(EventAction::On, &event);
        let id = emitter.on(event.clone(), handler);
        self.inner.subscriptions.lock().push((event, id));
        Ok(id)
    }

    /// Remove `handler` from an event on the bound node.
    /// Returns the number of subscriptions removed.
    pub fn off(&self, event: impl Into<EventId>, handler: &Handler) -> ComponentResult<usize> {
        if !self.state().is_live() {
            return Err(self.not_initialized("off"));
        }
        let emitter = self.emitter("off")?;
        let event = event.into();

        self.log_event(EventAction::Off, &event);
        let removed = emitter.off(event, handler);
        self.inner
            .subscriptions
            .lock()
            .retain(|(_, id)| emitter.contains(*id));
        Ok(removed)
    }

    /// Trigger an event on the bound node.
    /// Returns the number of handlers invoked.
    pub fn trigger(&self, event: impl Into<EventId>, payload: Value) -> ComponentResult<usize> {
        if !self.state().is_live() {
            return Err(self.not_initialized("trigger"));
        }
        let emitter = self.emitter("trigger")?;
        let event = event.into();

        self.log_event(EventAction::Trigger, &event);
        Ok(emitter.trigger(event, payload))
    }

    /// Number of subscriptions this instance still holds
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    fn emitter(&self, action: &'static str) -> ComponentResult<Emitter> {
        self.inner
            .binding
            .read()
            .as_ref()
            .map(|binding| binding.emitter.clone())
            .ok_or_else(|| self.not_initialized(action))
    }

    fn not_initialized(&self, action: &'static str) -> ComponentError {
        ComponentError::NotInitialized {
            component: self.definition_name().to_string(),
            action,
        }
    }

    fn release_subscriptions(&self) {
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        if subscriptions.is_empty() {
            return;
        }

        if let Ok(emitter) = self.emitter("off") {
            for (event, id) in &subscriptions {
                self.log_event(EventAction::Off, event);
                emitter.off_subscription(*id);
            }
        }
    }

    fn log_event(&self, action: EventAction, event: &EventId) {
        if self.inner.blueprint.config.debug.should_log(action, event.name()) {
            log::debug!(
                "[{}] {} {} '{}'",
                self.definition_name(),
                self.id(),
                action.as_str(),
                event
            );
        }
    }
}

/// Releases subscriptions and the registry entry exactly once, on drop
/// if teardown unwinds before reaching `run`
struct Release<'a> {
    instance: &'a Instance,
    done: bool,
}

impl<'a> Release<'a> {
    fn new(instance: &'a Instance) -> Self {
        Self { instance, done: false }
    }

    fn run(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.instance.release_subscriptions();
        self.instance.deregister();
    }
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id())
            .field("component", &self.definition_name())
            .field("state", &self.state())
            .finish()
    }
}
