//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, PolicyConfig, PriorityRule};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/filter-policy/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("filter-policy/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("filter-policy.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and overlay the values it sets onto `config`.
pub fn overlay_file(config: &mut PolicyConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    overlay_toml(config, &contents, path)
}

/// Overlay only the keys present in `contents`; everything else keeps its
/// current value so that files layer on top of each other.
fn overlay_toml(config: &mut PolicyConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(metadata) = table.get("metadata").and_then(|v| v.as_table()) {
        if let Some(v) = metadata.get("name").and_then(|v| v.as_str()) {
            config.metadata.name = v.to_string();
        }
        if let Some(v) = metadata.get("targets_key").and_then(|v| v.as_str()) {
            config.metadata.targets_key = v.to_string();
        }
        if let Some(v) = metadata.get("filters_key").and_then(|v| v.as_str()) {
            config.metadata.filters_key = v.to_string();
        }
    }

    if let Some(priorities) = table.get("priorities").and_then(|v| v.as_table()) {
        if let Some(v) = priorities.get("default").and_then(|v| v.as_integer()) {
            config.priorities.default = priority_value(v, path)?;
        }
        if let Some(rules) = priorities.get("rules").and_then(|v| v.as_array()) {
            let mut parsed = Vec::with_capacity(rules.len());
            for rule in rules {
                let contains = rule.get("contains").and_then(|v| v.as_str());
                let priority = rule.get("priority").and_then(|v| v.as_integer());
                match (contains, priority) {
                    (Some(contains), Some(priority)) => {
                        parsed.push(PriorityRule::new(contains, priority_value(priority, path)?));
                    }
                    _ => {
                        return Err(ConfigError::Parse {
                            path: path.to_path_buf(),
                            message: format!(
                                "priority rule needs `contains` and `priority`: {}",
                                rule
                            ),
                        });
                    }
                }
            }
            config.priorities.rules = parsed;
        }
    }

    if let Some(service) = table.get("service").and_then(|v| v.as_table()) {
        if let Some(v) = service.get("command_capacity").and_then(|v| v.as_integer()) {
            config.service.command_capacity = v.max(1) as usize;
        }
        if let Some(v) = service.get("notify_capacity").and_then(|v| v.as_integer()) {
            config.service.notify_capacity = v.max(1) as usize;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

fn priority_value(v: i64, path: &Path) -> Result<i32, ConfigError> {
    i32::try_from(v).map_err(|_| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("priority {} is out of range", v),
    })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut PolicyConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("FILTER_POLICY_METADATA_NAME") {
        config.metadata.name = v;
        sources.env_overrides.push("FILTER_POLICY_METADATA_NAME".to_string());
    }
    if let Ok(v) = env::var("FILTER_POLICY_TARGETS_KEY") {
        config.metadata.targets_key = v;
        sources.env_overrides.push("FILTER_POLICY_TARGETS_KEY".to_string());
    }
    if let Ok(v) = env::var("FILTER_POLICY_FILTERS_KEY") {
        config.metadata.filters_key = v;
        sources.env_overrides.push("FILTER_POLICY_FILTERS_KEY".to_string());
    }

    if let Ok(v) = env::var("FILTER_POLICY_DEFAULT_PRIORITY") {
        if let Ok(priority) = v.parse() {
            config.priorities.default = priority;
            sources.env_overrides.push("FILTER_POLICY_DEFAULT_PRIORITY".to_string());
        }
    }

    if let Ok(v) = env::var("FILTER_POLICY_COMMAND_CAPACITY") {
        if let Ok(capacity) = v.parse::<usize>() {
            config.service.command_capacity = capacity.max(1);
            sources.env_overrides.push("FILTER_POLICY_COMMAND_CAPACITY".to_string());
        }
    }
    if let Ok(v) = env::var("FILTER_POLICY_NOTIFY_CAPACITY") {
        if let Ok(capacity) = v.parse::<usize>() {
            config.service.notify_capacity = capacity.max(1);
            sources.env_overrides.push("FILTER_POLICY_NOTIFY_CAPACITY".to_string());
        }
    }

    if let Ok(v) = env::var("FILTER_POLICY_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("FILTER_POLICY_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}
