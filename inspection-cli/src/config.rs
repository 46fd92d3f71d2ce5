//! Optional TOML configuration for the estimator.
//!
//! ```toml
//! [api]
//! backend = "http"
//! base_url = "https://mrc.example.com/api"
//! auth_token = "..."
//! timeout_secs = 10
//!
//! [pricing]
//! table = "pricing.csv"
//!
//! [wizard]
//! jump_policy = "visited-only"
//! autosave_debounce_ms = 2000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use inspection_core::api::ApiConfig;
use inspection_core::wizard::{JumpPolicy, WizardConfig};
use serde::Deserialize;
use thiserror::Error;

/// Overrides `api.auth_token` when set.
pub const TOKEN_ENV_VAR: &str = "INSPECTION_API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    pub backend: Option<String>,
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingSection {
    /// CSV pricing table; relative paths resolve against the config file.
    pub table: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WizardSection {
    pub jump_policy: Option<JumpPolicy>,
    pub autosave_debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub api: ApiSection,
    pub pricing: PricingSection,
    pub wizard: WizardSection,
}

impl CliConfig {
    pub fn parse(
        text: &str,
        origin: &Path,
    ) -> Result<Self, ConfigError> {
        let config: CliConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, resolving a relative pricing table against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text, path)?;

        if let Some(table) = config.pricing.table.take() {
            let resolved = match path.parent() {
                Some(dir) if table.is_relative() => dir.join(table),
                _ => table,
            };
            config.pricing.table = Some(resolved);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_secs == Some(0) {
            return Err(ConfigError::ZeroDuration("api.timeout_secs"));
        }
        if self.wizard.autosave_debounce_ms == Some(0) {
            return Err(ConfigError::ZeroDuration("wizard.autosave_debounce_ms"));
        }
        Ok(())
    }

    /// Connection settings; `env_token` (from [`TOKEN_ENV_VAR`]) wins over
    /// the file's token.
    pub fn api_config(
        &self,
        env_token: Option<String>,
    ) -> ApiConfig {
        let defaults = ApiConfig::default();
        ApiConfig {
            backend: self.api.backend.clone().unwrap_or(defaults.backend),
            base_url: self.api.base_url.clone().unwrap_or(defaults.base_url),
            auth_token: env_token
                .filter(|token| !token.trim().is_empty())
                .or_else(|| self.api.auth_token.clone()),
            timeout: self
                .api
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn wizard_config(&self) -> WizardConfig {
        let defaults = WizardConfig::default();
        WizardConfig {
            jump_policy: self.wizard.jump_policy.unwrap_or(defaults.jump_policy),
            autosave_debounce: self
                .wizard
                .autosave_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.autosave_debounce),
        }
    }
}
