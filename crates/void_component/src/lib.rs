//! # void_component - Mixin-Composed Components
//!
//! Builds component types out of a base source and any number of mixins,
//! without class inheritance:
//! - **Composition**: sources fold over one build context, base first
//! - **Protected defaults**: each default attribute has exactly one source
//! - **Attachment**: nodes and required attributes are validated up front
//! - **Lifecycle**: every live instance is tracked by its definition and
//!   can be torn down in bulk, including teardowns that cascade
//!
//! ## Usage
//!
//! ```ignore
//! use void_component::prelude::*;
//!
//! let base = Mixin::new("tooltip", |ctx| {
//!     ctx.default_attrs([("text", Value::Null), ("delay", json!(250))]);
//! });
//! let with_logging = Mixin::new("withLogging", |ctx| {
//!     ctx.after_initialize(|instance| log::info!("{:?} ready", instance));
//! });
//!
//! let tooltip = define_component(base, [with_logging])?;
//! let node = ElementNode::new("button").into_ref();
//! let instance = tooltip.attach_to(Some(node), Attributes::new().with("text", "Save"))?;
//!
//! tooltip.teardown_all();
//! ```

pub mod attributes;
pub mod config;
pub mod definition;
pub mod error;
pub mod instance;
pub mod mixin;
pub mod node;
mod registry;

pub use attributes::{AttrDefault, AttributeDefaults, Attributes};
pub use config::{load_config, parse_config, ComponentConfig, ConfigError, DebugConfig, EventAction};
pub use definition::{define_component, define_component_with, Definition};
pub use error::{ComponentError, ComponentResult};
pub use instance::{Instance, InstanceId, InstanceState};
pub use mixin::{DefinitionContext, Hook, Mixin, Prototype};
pub use node::{ElementNode, EmptyNode, Node, NodeRef};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attributes::Attributes;
    pub use crate::config::ComponentConfig;
    pub use crate::definition::{define_component, define_component_with, Definition};
    pub use crate::error::{ComponentError, ComponentResult};
    pub use crate::instance::{Instance, InstanceState};
    pub use crate::mixin::{DefinitionContext, Mixin};
    pub use crate::node::{ElementNode, EmptyNode, Node, NodeRef};
    pub use serde_json::{json, Value};
    pub use void_event::{handler, Emitter, Event, Handler};
}
