//! Component engine configuration
//!
//! Loaded from TOML. Every section is optional and falls back to defaults.
//!
//! ```toml
//! [debug]
//! enabled = true
//! actions = ["on", "off", "trigger"]
//! events = ["click"]    # empty = every event
//!
//! [lifecycle]
//! warn_on_empty_teardown = false
//! ```

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Errors from config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Emitter action subject to debug logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    On,
    Off,
    Trigger,
}

impl EventAction {
    /// All actions
    pub const ALL: [EventAction; 3] = [EventAction::On, EventAction::Off, EventAction::Trigger];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::On => "on",
            EventAction::Off => "off",
            EventAction::Trigger => "trigger",
        }
    }
}

/// Event traffic logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Master switch
    pub enabled: bool,
    /// Actions to log
    pub actions: Vec<EventAction>,
    /// Event names to log (empty = all)
    pub events: Vec<String>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            actions: EventAction::ALL.to_vec(),
            events: Vec::new(),
        }
    }
}

impl DebugConfig {
    /// Whether an emitter action on `event` should be logged
    pub fn should_log(&self, action: EventAction, event: &str) -> bool {
        self.enabled
            && self.actions.contains(&action)
            && (self.events.is_empty() || self.events.iter().any(|e| e == event))
    }
}

/// Lifecycle diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Emit a warning when `teardown_all` finds no live instance
    pub warn_on_empty_teardown: bool,
}

/// Configuration shared by every instance of a definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    pub debug: DebugConfig,
    pub lifecycle: LifecycleConfig,
}

impl ComponentConfig {
    /// Config with event logging enabled for every action and event
    pub fn debug() -> Self {
        Self {
            debug: DebugConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Parse a config from TOML string
pub fn parse_config(content: &str) -> ConfigResult<ComponentConfig> {
    Ok(toml::from_str(content)?)
}

/// Load and parse a config file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ComponentConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
