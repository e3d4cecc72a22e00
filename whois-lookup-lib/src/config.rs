//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and merging
//! configurations with proper precedence rules, plus the `WL_*` environment
//! variables that sit between config files and command-line flags.

use crate::error::WhoisError;
use crate::extract::{FieldPattern, FieldPatterns};
use crate::types::QueryOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for query options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Field pattern overrides, keyed by field name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<BTreeMap<String, String>>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to [`QueryOptions`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Per-operation timeout (as string, e.g. "5s", "1500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_referral: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    /// Delay between failed attempts (same format as `timeout`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_rate_limit: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_fallback: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Print JSON instead of the human-readable summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Include every extracted field, not just the core ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_fields: Option<bool>,
}

impl FileConfig {
    /// Overlay the `[defaults]` section onto `options`.
    ///
    /// Values that failed validation never reach here, so unparsable
    /// durations are simply skipped.
    pub fn apply_to(&self, mut options: QueryOptions) -> QueryOptions {
        let Some(defaults) = &self.defaults else {
            return options;
        };

        if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration_string) {
            options.timeout = timeout;
        }
        if let Some(follow) = defaults.follow_referral {
            options.follow_referral = follow;
        }
        if let Some(retries) = defaults.retry_count {
            options.retry_count = retries;
        }
        if let Some(delay) = defaults
            .retry_delay
            .as_deref()
            .and_then(parse_duration_string)
        {
            options.retry_delay = delay;
        }
        if let Some(handle) = defaults.handle_rate_limit {
            options.handle_rate_limit = handle;
        }
        if let Some(rdap) = defaults.rdap_fallback {
            options.use_rdap_fallback = rdap;
        }

        options
    }

    /// The default pattern table with this file's overrides applied.
    ///
    /// Without a `[patterns]` section this is the shared default table.
    pub fn field_patterns(&self) -> Result<Arc<FieldPatterns>, WhoisError> {
        let shared = FieldPatterns::shared();
        let Some(overrides) = self.patterns.as_ref().filter(|p| !p.is_empty()) else {
            return Ok(shared);
        };

        let mut table = (*shared).clone();
        for (name, pattern) in overrides {
            table = table.with_override(name, pattern)?;
        }
        Ok(Arc::new(table))
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if parsing or validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, WhoisError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WhoisError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            WhoisError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;

        self.validate_config(&config)?;
        debug!(path = %path.display(), "loaded configuration file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, WhoisError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring configuration file"),
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where set later"
                };
                debug!(path = %path.display(), status, "configuration file");
            }
        }

        Ok(merged_config)
    }

    /// Local configuration in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./whois-lookup.toml", "./.whois-lookup.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Global configuration in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".whois-lookup.toml", "whois-lookup.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// XDG configuration path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("whois-lookup").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.follow_referral.is_some() {
                        lower_defaults.follow_referral = higher_defaults.follow_referral;
                    }
                    if higher_defaults.retry_count.is_some() {
                        lower_defaults.retry_count = higher_defaults.retry_count;
                    }
                    if higher_defaults.retry_delay.is_some() {
                        lower_defaults.retry_delay = higher_defaults.retry_delay;
                    }
                    if higher_defaults.handle_rate_limit.is_some() {
                        lower_defaults.handle_rate_limit = higher_defaults.handle_rate_limit;
                    }
                    if higher_defaults.rdap_fallback.is_some() {
                        lower_defaults.rdap_fallback = higher_defaults.rdap_fallback;
                    }
                    Some(lower_defaults)
                }
                (None, Some(higher_defaults)) => Some(higher_defaults),
                (Some(lower_defaults), None) => Some(lower_defaults),
                (None, None) => None,
            },
            patterns: match (lower.patterns, higher.patterns) {
                (Some(mut lower_patterns), Some(higher_patterns)) => {
                    lower_patterns.extend(higher_patterns);
                    Some(lower_patterns)
                }
                (None, Some(higher_patterns)) => Some(higher_patterns),
                (Some(lower_patterns), None) => Some(lower_patterns),
                (None, None) => None,
            },
            output: match (lower.output, higher.output) {
                (Some(mut lower_output), Some(higher_output)) => {
                    if higher_output.json.is_some() {
                        lower_output.json = higher_output.json;
                    }
                    if higher_output.all_fields.is_some() {
                        lower_output.all_fields = higher_output.all_fields;
                    }
                    Some(lower_output)
                }
                (None, Some(higher_output)) => Some(higher_output),
                (Some(lower_output), None) => Some(lower_output),
                (None, None) => None,
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), WhoisError> {
        if let Some(defaults) = &config.defaults {
            for (key, value) in [
                ("timeout", &defaults.timeout),
                ("retry_delay", &defaults.retry_delay),
            ] {
                if let Some(value) = value {
                    if parse_duration_string(value).is_none() {
                        return Err(WhoisError::config(format!(
                            "Invalid {} format '{}'. Use format like '5s', '1500ms', '2m'",
                            key, value
                        )));
                    }
                }
            }

            if defaults.timeout.as_deref().and_then(parse_duration_string) == Some(Duration::ZERO) {
                return Err(WhoisError::config("Timeout must be greater than zero"));
            }
        }

        if let Some(patterns) = &config.patterns {
            for (name, pattern) in patterns {
                if name.trim().is_empty() {
                    return Err(WhoisError::config("Pattern names cannot be empty"));
                }
                FieldPattern::new(name.as_str(), pattern).map_err(|e| {
                    WhoisError::config(format!("Invalid pattern for '{}': {}", name, e))
                })?;
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `WL_*`
/// environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub retry_count: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub follow_referral: Option<bool>,
    pub handle_rate_limit: Option<bool>,
    pub rdap_fallback: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the environment values onto `options`.
    pub fn apply_to(&self, mut options: QueryOptions) -> QueryOptions {
        if let Some(timeout) = self.timeout {
            options.timeout = timeout;
        }
        if let Some(retries) = self.retry_count {
            options.retry_count = retries;
        }
        if let Some(delay) = self.retry_delay {
            options.retry_delay = delay;
        }
        if let Some(follow) = self.follow_referral {
            options.follow_referral = follow;
        }
        if let Some(handle) = self.handle_rate_limit {
            options.handle_rate_limit = handle;
        }
        if let Some(rdap) = self.rdap_fallback {
            options.use_rdap_fallback = rdap;
        }
        options
    }
}

/// Load configuration from environment variables.
///
/// Parses all `WL_*` variables. Invalid values are logged as warnings and
/// ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("WL_TIMEOUT") {
        match parse_duration_string(&val) {
            Some(timeout) if !timeout.is_zero() => {
                debug!(WL_TIMEOUT = %val, "using environment override");
                env_config.timeout = Some(timeout);
            }
            _ => warn!("Invalid WL_TIMEOUT='{}', use format like '5s', '1500ms'", val),
        }
    }

    if let Some(val) = lookup("WL_RETRIES") {
        match val.trim().parse::<u32>() {
            Ok(retries) => {
                debug!(WL_RETRIES = retries, "using environment override");
                env_config.retry_count = Some(retries);
            }
            Err(_) => warn!("Invalid WL_RETRIES='{}', must be a non-negative integer", val),
        }
    }

    if let Some(val) = lookup("WL_RETRY_DELAY") {
        match parse_duration_string(&val) {
            Some(delay) => {
                debug!(WL_RETRY_DELAY = %val, "using environment override");
                env_config.retry_delay = Some(delay);
            }
            None => warn!("Invalid WL_RETRY_DELAY='{}', use format like '1s', '500ms'", val),
        }
    }

    env_config.follow_referral = lookup("WL_FOLLOW").and_then(|v| parse_flag("WL_FOLLOW", &v));
    env_config.handle_rate_limit = lookup("WL_HANDLE_RATE_LIMIT")
        .and_then(|v| parse_flag("WL_HANDLE_RATE_LIMIT", &v));
    env_config.rdap_fallback =
        lookup("WL_RDAP_FALLBACK").and_then(|v| parse_flag("WL_RDAP_FALLBACK", &v));

    if let Some(config_path) = lookup("WL_CONFIG") {
        if !config_path.trim().is_empty() {
            debug!(WL_CONFIG = %config_path, "using environment override");
            env_config.config = Some(config_path);
        }
    }

    env_config
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!("Invalid {}='{}', use true/false", name, value);
            None
        }
    }
}

/// Parse a duration string like "5s", "1500ms", "2m".
///
/// A bare number is taken as milliseconds, matching the CLI flags.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        value.parse::<u64>().ok().map(Duration::from_millis)
    }
}
