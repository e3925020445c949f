//! Component definitions
//!
//! [`define_component`] folds a base and any number of mixins into a
//! [`Definition`]. The definition is immutable apart from the registry of
//! instances currently attached through it.
//!
//! ```ignore
//! let base = Mixin::new("testComponent", |ctx| ctx.default_attrs([("core", 35)]));
//! let extra = Mixin::new("withGoodDefaults", |ctx| ctx.default_attrs([("extra", 38)]));
//!
//! let component = define_component(base, [extra])?;
//! assert_eq!(component.to_string(), "testComponent, withGoodDefaults");
//!
//! let instance = component.attach_to(Some(node), Attributes::new())?;
//! component.teardown_all();
//! ```

use std::fmt;
use std::sync::{Arc, Weak};
use parking_lot::Mutex;

use crate::attributes::{AttributeDefaults, Attributes};
use crate::config::ComponentConfig;
use crate::error::ComponentResult;
use crate::instance::Instance;
use crate::mixin::{DefinitionContext, LifecycleHooks, Mixin, Prototype};
use crate::node::NodeRef;
use crate::registry::LiveRegistry;

/// Immutable part of a definition, shared with every instance
pub(crate) struct Blueprint {
    pub(crate) sources: Vec<Mixin>,
    pub(crate) defaults: AttributeDefaults,
    pub(crate) prototype: Prototype,
    pub(crate) hooks: LifecycleHooks,
    pub(crate) config: ComponentConfig,
}

impl Blueprint {
    /// Name of the base source
    pub(crate) fn name(&self) -> &str {
        self.sources.first().map_or("", Mixin::name)
    }

    /// Comma-joined names of all sources
    pub(crate) fn composite_name(&self) -> String {
        self.sources
            .iter()
            .map(Mixin::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub(crate) struct DefinitionInner {
    pub(crate) blueprint: Arc<Blueprint>,
    pub(crate) live: Mutex<LiveRegistry>,
}

/// A composed component type
#[derive(Clone)]
pub struct Definition {
    inner: Arc<DefinitionInner>,
}

/// Compose a base and mixins into a definition with the default config
pub fn define_component<I>(base: Mixin, mixins: I) -> ComponentResult<Definition>
where
    I: IntoIterator<Item = Mixin>,
{
    define_component_with(ComponentConfig::default(), base, mixins)
}

/// Compose a base and mixins into a definition
pub fn define_component_with<I>(
    config: ComponentConfig,
    base: Mixin,
    mixins: I,
) -> ComponentResult<Definition>
where
    I: IntoIterator<Item = Mixin>,
{
    let sources: Vec<Mixin> = std::iter::once(base).chain(mixins).collect();
    Definition::build(config, sources)
}

impl Definition {
    fn build(config: ComponentConfig, sources: Vec<Mixin>) -> ComponentResult<Self> {
        let mut ctx = DefinitionContext::new();
        for source in &sources {
            ctx.apply(source);
        }

        let composition = ctx.finish().map_err(|e| {
            log::debug!("definition build failed: {}", e);
            e
        })?;

        let blueprint = Blueprint {
            sources,
            defaults: composition.defaults,
            prototype: composition.prototype,
            hooks: composition.hooks,
            config,
        };

        log::debug!(
            "Defined component '{}' ({} default attr(s), {} required)",
            blueprint.composite_name(),
            blueprint.defaults.len(),
            blueprint.defaults.required().count()
        );

        Ok(Self {
            inner: Arc::new(DefinitionInner {
                blueprint: Arc::new(blueprint),
                live: Mutex::new(LiveRegistry::new()),
            }),
        })
    }

    /// Name of the base source
    pub fn name(&self) -> &str {
        self.inner.blueprint.name()
    }

    /// Source names in declaration order, base first
    pub fn source_names(&self) -> Vec<&str> {
        self.inner.blueprint.sources.iter().map(Mixin::name).collect()
    }

    /// Merged attribute defaults
    pub fn defaults(&self) -> &AttributeDefaults {
        &self.inner.blueprint.defaults
    }

    /// Fields inherited by every instance
    pub fn prototype(&self) -> &Prototype {
        &self.inner.blueprint.prototype
    }

    pub fn config(&self) -> &ComponentConfig {
        &self.inner.blueprint.config
    }

    /// Construct an uninitialized instance. Nothing is registered until
    /// [`Instance::initialize`] succeeds.
    pub fn new_instance(&self) -> Instance {
        Instance::construct(Arc::clone(&self.inner.blueprint), self.downgrade())
    }

    /// Construct and initialize in one step
    pub fn attach_to(&self, node: Option<NodeRef>, attrs: Attributes) -> ComponentResult<Instance> {
        self.new_instance().initialize(node, attrs)
    }

    /// Tear down every instance registered when the call starts.
    ///
    /// Instances torn down by an earlier teardown in the same pass are
    /// skipped. Returns the number of instances this call tore down.
    pub fn teardown_all(&self) -> usize {
        let snapshot = self.inner.live.lock().snapshot();

        if snapshot.is_empty() {
            if self.config().lifecycle.warn_on_empty_teardown {
                log::warn!("teardown_all on '{}' found no live instance", self);
            }
            return 0;
        }

        let mut torn_down = 0;
        for instance in &snapshot {
            let registered = self.inner.live.lock().contains(instance.id());
            if !registered {
                log::trace!("{} already torn down, skipping", instance.id());
                continue;
            }
            if instance.teardown() {
                torn_down += 1;
            }
        }

        log::debug!(
            "teardown_all on '{}': {} of {} instance(s) torn down directly",
            self,
            torn_down,
            snapshot.len()
        );
        torn_down
    }

    /// Registered instances, oldest first
    pub fn instances(&self) -> Vec<Instance> {
        self.inner.live.lock().snapshot()
    }

    pub fn instance_count(&self) -> usize {
        self.inner.live.lock().len()
    }

    pub fn has_instances(&self) -> bool {
        !self.inner.live.lock().is_empty()
    }

    /// Registered instances bound to `node`
    pub fn instances_on(&self, node: &NodeRef) -> Vec<Instance> {
        self.inner.live.lock().bound_to(node)
    }

    /// New definition with this one's sources followed by `extra`.
    /// The new definition starts with an empty registry.
    pub fn mixin<I>(&self, extra: I) -> ComponentResult<Definition>
    where
        I: IntoIterator<Item = Mixin>,
    {
        let sources: Vec<Mixin> = self
            .inner
            .blueprint
            .sources
            .iter()
            .cloned()
            .chain(extra)
            .collect();
        Self::build(self.config().clone(), sources)
    }

    /// Check whether two handles refer to the same definition
    pub fn same(&self, other: &Definition) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<DefinitionInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<DefinitionInner>) -> Self {
        Self { inner }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.blueprint.composite_name())
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("sources", &self.source_names())
            .field("instances", &self.instance_count())
            .finish()
    }
}
