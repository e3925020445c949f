//! Error types for component definition and attachment

use thiserror::Error;

use crate::config::ConfigError;
use crate::instance::InstanceState;

/// Component errors
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Two sources contributed the same default attribute
    #[error("default attrs from \"{contributor}\" attempted to overwrite \"{key}\" while running in protected mode")]
    DefinitionConflict {
        key: String,
        contributor: String,
        existing_contributor: String,
    },

    /// Attachment without a usable node
    #[error("Component needs a node")]
    MissingNode,

    /// A required attribute is still unresolved after overlaying caller values
    #[error("Required attribute \"{name}\" not specified in attachTo for component \"{component}\".")]
    MissingRequiredAttribute { name: String, component: String },

    /// Initialize called on an instance that is not freshly constructed
    #[error("Component \"{component}\" cannot be initialized from state {state:?}")]
    InvalidState {
        component: String,
        state: InstanceState,
    },

    /// Event capability used while the instance is not live
    #[error("Component \"{component}\" is not initialized; cannot {action}")]
    NotInitialized {
        component: String,
        action: &'static str,
    },

    /// The owning definition no longer exists
    #[error("Definition for component \"{component}\" has been dropped")]
    DefinitionDropped { component: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type ComponentResult<T> = Result<T, ComponentError>;
