//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Where the engine reads its configuration blobs from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Name of the metadata object carrying filter configuration.
    /// Default: filters
    #[serde(default = "MetadataConfig::default_name")]
    pub name: String,

    /// Key holding the JSON object of configured targets.
    /// Default: filters.configured.targets
    #[serde(default = "MetadataConfig::default_targets_key")]
    pub targets_key: String,

    /// Key holding the JSON array of configured filters.
    /// Default: filters.configured.filters
    #[serde(default = "MetadataConfig::default_filters_key")]
    pub filters_key: String,
}

impl MetadataConfig {
    fn default_name() -> String {
        "filters".to_string()
    }

    fn default_targets_key() -> String {
        "filters.configured.targets".to_string()
    }

    fn default_filters_key() -> String {
        "filters.configured.filters".to_string()
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            targets_key: Self::default_targets_key(),
            filters_key: Self::default_filters_key(),
        }
    }
}

/// One substring heuristic: a group key containing `contains` gets `priority`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub contains: String,
    pub priority: i32,
}

impl PriorityRule {
    pub fn new(contains: impl Into<String>, priority: i32) -> Self {
        Self {
            contains: contains.into(),
            priority,
        }
    }
}

/// Default filter priorities derived from the link group name.
///
/// Rules are checked in order and the first match wins. Keys matching no
/// rule get `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// Default: 100
    #[serde(default = "PriorityConfig::default_priority")]
    pub default: i32,

    /// Default: loopback=300, filter-chain=200, echo-cancel=0
    #[serde(default = "PriorityConfig::default_rules")]
    pub rules: Vec<PriorityRule>,
}

impl PriorityConfig {
    fn default_priority() -> i32 {
        100
    }

    fn default_rules() -> Vec<PriorityRule> {
        vec![
            PriorityRule::new("loopback", 300),
            PriorityRule::new("filter-chain", 200),
            // echo-cancel sits closest to the device so it cancels everything above it
            PriorityRule::new("echo-cancel", 0),
        ]
    }

    /// Priority for a filter whose link group is `group_key`.
    pub fn priority_for(&self, group_key: &str) -> i32 {
        self.rules
            .iter()
            .find(|rule| group_key.contains(rule.contains.as_str()))
            .map(|rule| rule.priority)
            .unwrap_or(self.default)
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            default: Self::default_priority(),
            rules: Self::default_rules(),
        }
    }
}

/// Async service sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bounded command channel capacity.
    /// Default: 256
    #[serde(default = "ServiceConfig::default_command_capacity")]
    pub command_capacity: usize,

    /// Broadcast capacity for change notifications.
    /// Default: 16
    #[serde(default = "ServiceConfig::default_notify_capacity")]
    pub notify_capacity: usize,
}

impl ServiceConfig {
    fn default_command_capacity() -> usize {
        256
    }

    fn default_notify_capacity() -> usize {
        16
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_capacity: Self::default_command_capacity(),
            notify_capacity: Self::default_notify_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
