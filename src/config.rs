//! # Configuration Module
//!
//! Process-wide, read-only settings consulted by request handlers through
//! [`RequestContext::config`](crate::context::RequestContext::config) and
//! [`RequestContext::production`](crate::context::RequestContext::production).
//!
//! ## Sources
//!
//! [`AppConfig`] is loaded from YAML and then overlaid with environment variables:
//!
//! ```yaml
//! production: false
//! settings:
//!   assets_url: /assets
//!   session_ttl: 3600
//! ```
//!
//! | Variable | Effect |
//! |---|---|
//! | `BRRTR_ENV` | `production` sets production mode, anything else clears it |
//! | `BRRTR_SETTING_<KEY>` | sets setting `<key>` (lower-cased) |
//!
//! Unknown keys read as the empty string.
//!
//! ## Usage
//!
//! ```rust
//! use brrtrouter_context::config::{AppConfig, Config};
//!
//! let config = AppConfig::from_yaml_str("settings:\n  name: demo\n").unwrap();
//! assert_eq!(config.config("name"), "demo");
//! assert_eq!(config.config("missing"), "");
//! assert!(!config.production());
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::info;

/// Environment variable selecting production mode.
pub const ENV_VAR: &str = "BRRTR_ENV";

/// Prefix for per-setting environment overrides.
pub const SETTING_PREFIX: &str = "BRRTR_SETTING_";

/// Read-only configuration view shared by every request.
pub trait Config: Send + Sync {
    /// Setting value for `key`, `""` when unset.
    fn config(&self, key: &str) -> String;

    /// Whether the process runs in production mode.
    fn production(&self) -> bool;
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    production: bool,
    #[serde(default)]
    settings: HashMap<String, serde_yaml::Value>,
}

/// Static application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    production: bool,
    settings: HashMap<String, String>,
}

impl AppConfig {
    /// Parse configuration from YAML. Scalar settings are stored as strings.
    ///
    /// # Errors
    ///
    /// Fails on invalid YAML or when a setting is a sequence or mapping.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(yaml).context("Failed to parse config YAML")?;
        let mut settings = HashMap::with_capacity(raw.settings.len());
        for (key, value) in raw.settings {
            let value = match value {
                serde_yaml::Value::Null => String::new(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::String(s) => s,
                _ => bail!("setting '{key}' must be a scalar value"),
            };
            settings.insert(key, value);
        }
        Ok(Self {
            production: raw.production,
            settings,
        })
    }

    /// Load a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&yaml)
            .with_context(|| format!("Invalid config file {}", path.display()))?
            .with_env_overrides();
        info!(
            path = %path.display(),
            production = config.production,
            settings_count = config.settings.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(env::vars())
    }

    /// Overlay `BRRTR_*` entries from an explicit variable list.
    #[must_use]
    pub fn with_overrides_from<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if name == ENV_VAR {
                self.production = value.trim().eq_ignore_ascii_case("production");
            } else if let Some(key) = name.strip_prefix(SETTING_PREFIX) {
                if !key.is_empty() {
                    self.settings.insert(key.to_ascii_lowercase(), value);
                }
            }
        }
        self
    }

    /// Set one value programmatically.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    pub fn set_production(&mut self, production: bool) {
        self.production = production;
    }
}

impl Config for AppConfig {
    fn config(&self, key: &str) -> String {
        self.settings.get(key).cloned().unwrap_or_default()
    }

    fn production(&self) -> bool {
        self.production
    }
}
