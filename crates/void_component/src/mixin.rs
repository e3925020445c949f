//! Mixins and the build-time definition context
//!
//! A definition is a fold of its sources over one [`DefinitionContext`]: the
//! base runs first, then every mixin in declaration order. Sources contribute
//! prototype fields, attribute defaults and lifecycle hooks. Nothing is
//! validated until all sources have run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use serde_json::Value;

use crate::attributes::{AttrDefault, AttributeDefaults};
use crate::error::ComponentResult;
use crate::instance::Instance;

/// Lifecycle callback
pub type Hook = Arc<dyn Fn(&Instance) + Send + Sync>;

type SourceFn = Arc<dyn Fn(&mut DefinitionContext) + Send + Sync>;

/// A named source contributing to a definition
#[derive(Clone)]
pub struct Mixin {
    name: Arc<str>,
    apply: SourceFn,
}

impl Mixin {
    /// Create a mixin from a name and a build function
    pub fn new<F>(name: impl Into<Arc<str>>, apply: F) -> Self
    where
        F: Fn(&mut DefinitionContext) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Mixin").field(&self.name).finish()
    }
}

/// Fields shared by every instance of a definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prototype {
    fields: BTreeMap<String, Value>,
}

impl Prototype {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Hooks contributed by sources, in declaration order
#[derive(Clone, Default)]
pub(crate) struct LifecycleHooks {
    pub(crate) after_initialize: Vec<Hook>,
    pub(crate) before_teardown: Vec<Hook>,
    pub(crate) after_teardown: Vec<Hook>,
}

/// Build output of a successful fold
pub(crate) struct Composition {
    pub(crate) defaults: AttributeDefaults,
    pub(crate) prototype: Prototype,
    pub(crate) hooks: LifecycleHooks,
}

/// Context handed to every source while a definition is built
pub struct DefinitionContext {
    current: Arc<str>,
    contributions: Vec<AttrDefault>,
    prototype: Prototype,
    hooks: LifecycleHooks,
}

impl DefinitionContext {
    pub(crate) fn new() -> Self {
        Self {
            current: Arc::from(""),
            contributions: Vec::new(),
            prototype: Prototype::default(),
            hooks: LifecycleHooks::default(),
        }
    }

    /// Run one source against this context
    pub(crate) fn apply(&mut self, source: &Mixin) {
        self.current = Arc::clone(&source.name);
        (source.apply)(self);
    }

    /// Validate everything the sources contributed
    pub(crate) fn finish(self) -> ComponentResult<Composition> {
        Ok(Composition {
            defaults: AttributeDefaults::merge(self.contributions)?,
            prototype: self.prototype,
            hooks: self.hooks,
        })
    }

    /// Name of the source currently running
    pub fn source_name(&self) -> &str {
        &self.current
    }

    /// Set a prototype field. Later sources replace earlier values.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if self.prototype.fields.insert(name.clone(), value.into()).is_some() {
            log::trace!("'{}' replaced prototype field '{}'", self.current, name);
        }
    }

    /// Contribute default attributes. A `null` value marks the attribute as
    /// required. Keys already contributed fail the build.
    pub fn default_attrs<I, K, V>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in mapping {
            self.contributions.push(AttrDefault {
                name: name.into(),
                value: value.into(),
                source: self.current.to_string(),
            });
        }
    }

    /// Run after an instance has been initialized and registered
    pub fn after_initialize<F>(&mut self, hook: F)
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        self.hooks.after_initialize.push(Arc::new(hook));
    }

    /// Run at the start of teardown, while subscriptions are still live
    pub fn before_teardown<F>(&mut self, hook: F)
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        self.hooks.before_teardown.push(Arc::new(hook));
    }

    /// Run once the instance has left its definition's registry
    pub fn after_teardown<F>(&mut self, hook: F)
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        self.hooks.after_teardown.push(Arc::new(hook));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fold_tags_contributions() {
        let base = Mixin::new("base", |ctx| {
            ctx.set_field("testVal", 1066);
            ctx.default_attrs([("core", 35)]);
        });
        let extra = Mixin::new("withExtra", |ctx| {
            assert_eq!(ctx.source_name(), "withExtra");
            ctx.default_attrs([("extra", 38)]);
        });

        let mut ctx = DefinitionContext::new();
        ctx.apply(&base);
        ctx.apply(&extra);
        let composition = ctx.finish().unwrap();

        assert_eq!(composition.prototype.get("testVal"), Some(&json!(1066)));
        assert_eq!(composition.defaults.source_of("core"), Some("base"));
        assert_eq!(composition.defaults.source_of("extra"), Some("withExtra"));
    }

    #[test]
    fn test_same_source_twice_conflicts() {
        let noisy = Mixin::new("noisy", |ctx| {
            ctx.default_attrs([("core", 1)]);
            ctx.default_attrs([("core", 2)]);
        });

        let mut ctx = DefinitionContext::new();
        ctx.apply(&noisy);
        assert!(ctx.finish().is_err());
    }

    #[test]
    fn test_fields_last_writer_wins() {
        let a = Mixin::new("a", |ctx| ctx.set_field("mode", "a"));
        let b = Mixin::new("b", |ctx| ctx.set_field("mode", "b"));

        let mut ctx = DefinitionContext::new();
        ctx.apply(&a);
        ctx.apply(&b);
        let composition = ctx.finish().unwrap();

        assert_eq!(composition.prototype.get("mode"), Some(&json!("b")));
        assert_eq!(composition.prototype.len(), 1);
        assert!(composition.prototype.contains("mode"));
        assert!(!composition.prototype.contains("other"));

        let fields: Vec<_> = composition.prototype.iter().collect();
        assert_eq!(fields, vec![("mode", &json!("b"))]);
    }

    #[test]
    fn test_empty_prototype() {
        let ctx = DefinitionContext::new();
        let composition = ctx.finish().unwrap();
        assert!(composition.prototype.is_empty());
        assert_eq!(composition.prototype.iter().count(), 0);
    }

    #[test]
    fn test_hooks_collected_in_order() {
        let a = Mixin::new("a", |ctx| {
            ctx.after_initialize(|_| {});
            ctx.before_teardown(|_| {});
        });
        let b = Mixin::new("b", |ctx| {
            ctx.after_initialize(|_| {});
            ctx.after_teardown(|_| {});
        });

        let mut ctx = DefinitionContext::new();
        ctx.apply(&a);
        ctx.apply(&b);
        let composition = ctx.finish().unwrap();

        assert_eq!(composition.hooks.after_initialize.len(), 2);
        assert_eq!(composition.hooks.before_teardown.len(), 1);
        assert_eq!(composition.hooks.after_teardown.len(), 1);
    }
}
