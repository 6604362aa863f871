//! Workspace configuration.
//!
//! Loaded from a readable UTF-8 JSON file with this shape:
//!
//! ```json
//! {
//!   "api_key": "<bearer token for the completions endpoint>",
//!   "model": "LongCat-Flash-Lite",
//!   "base_url": "https://api.longcat.chat/openai",
//!   "timeout_sec": 120,
//!   "approval_mode": "strict"
//! }
//! ```
//!
//! Contract notes:
//! - `api_key` is required and must be non-empty.
//! - `model` is optional and defaults to the crate default model.
//! - `timeout_sec` is optional and must be > 0 when provided.
//! - `approval_mode` is optional (`strict` | `permissive`), default strict.
//! - Unknown JSON fields are rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use approval_gate::ApprovalPolicy;
use completions_api::payload::DEFAULT_MODEL;
use completions_api::CompletionsConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config at {path} is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    Strict,
    Permissive,
}

impl From<ApprovalMode> for ApprovalPolicy {
    fn from(mode: ApprovalMode) -> Self {
        match mode {
            ApprovalMode::Strict => Self::Strict,
            ApprovalMode::Permissive => Self::Permissive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
    #[serde(default = "default_approval_mode")]
    pub approval_mode: ApprovalMode,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_approval_mode() -> ApprovalMode {
    ApprovalMode::Strict
}

impl WorkspaceConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "'api_key' must be non-empty".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "'model' must be non-empty when provided".to_string(),
            });
        }
        if self.timeout_sec == Some(0) {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "'timeout_sec' must be > 0 when provided".to_string(),
            });
        }
        Ok(())
    }

    /// Transport configuration derived from this file.
    #[must_use]
    pub fn completions_config(&self) -> CompletionsConfig {
        let mut config = CompletionsConfig::new(self.api_key.clone());
        if let Some(base_url) = self.base_url.as_deref() {
            config = config.with_base_url(base_url);
        }
        if let Some(timeout_sec) = self.timeout_sec {
            config = config.with_timeout(Duration::from_secs(timeout_sec));
        }
        config
    }

    #[must_use]
    pub fn approval_policy(&self) -> ApprovalPolicy {
        self.approval_mode.into()
    }
}
