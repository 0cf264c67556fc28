//! Layered configuration loading for the filter policy engine.
//!
//! Kept dependency-light so that both the engine crate and whatever daemon
//! embeds it can share one configuration model.
//!
//! # Usage
//!
//! ```rust,no_run
//! use policyconf::PolicyConfig;
//!
//! let config = PolicyConfig::load().expect("Failed to load config");
//!
//! println!("targets key: {}", config.metadata.targets_key);
//! println!("loopback priority: {}", config.priorities.priority_for("loopback-1"));
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/filter-policy/config.toml` (system)
//! 2. `~/.config/filter-policy/config.toml` (user)
//! 3. `./filter-policy.toml` (local override)
//! 4. Environment variables (`FILTER_POLICY_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [metadata]
//! name = "filters"
//! targets_key = "filters.configured.targets"
//! filters_key = "filters.configured.filters"
//!
//! [priorities]
//! default = 100
//! rules = [
//!     { contains = "loopback", priority = 300 },
//!     { contains = "echo-cancel", priority = 0 },
//! ]
//!
//! [service]
//! command_capacity = 256
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{MetadataConfig, PriorityConfig, PriorityRule, ServiceConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete filter policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub priorities: PriorityConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl PolicyConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/filter-policy/config.toml`
    /// 3. `~/.config/filter-policy/config.toml`
    /// 4. `./filter-policy.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` replacing the local override.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = PolicyConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::overlay_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Filter Policy Configuration\n\n");

        output.push_str("[metadata]\n");
        output.push_str(&format!("name = \"{}\"\n", self.metadata.name));
        output.push_str(&format!("targets_key = \"{}\"\n", self.metadata.targets_key));
        output.push_str(&format!("filters_key = \"{}\"\n", self.metadata.filters_key));

        output.push_str("\n[priorities]\n");
        output.push_str(&format!("default = {}\n", self.priorities.default));
        output.push_str("rules = [\n");
        for rule in &self.priorities.rules {
            output.push_str(&format!(
                "    {{ contains = \"{}\", priority = {} }},\n",
                rule.contains, rule.priority
            ));
        }
        output.push_str("]\n");

        output.push_str("\n[service]\n");
        output.push_str(&format!("command_capacity = {}\n", self.service.command_capacity));
        output.push_str(&format!("notify_capacity = {}\n", self.service.notify_capacity));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}
