//! Configuration for ADS
//!
//! Sources, highest priority first:
//! 1. Environment (`ADS_LLM_ENDPOINT`, `ADS_LLM_MODEL`, `ADS_LLM_API_KEY`)
//! 2. TOML file (`--config` or `ADS_CONFIG`)
//! 3. Built-in defaults
//!
//! Thresholds are deliberately NOT configurable here. They only change
//! through the human gate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::history::DEFAULT_HISTORY_CAPACITY;
use crate::core::pipeline::DEFAULT_MODEL_VERSION;
use crate::error::{AdsError, Result};
use crate::types::RiskProfileId;
use crate::{EXECUTOR_TEMPERATURE, EXECUTOR_TIMEOUT_SECS};

pub const ENV_CONFIG_PATH: &str = "ADS_CONFIG";
pub const ENV_LLM_ENDPOINT: &str = "ADS_LLM_ENDPOINT";
pub const ENV_LLM_MODEL: &str = "ADS_LLM_MODEL";
pub const ENV_LLM_API_KEY: &str = "ADS_LLM_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    /// Recorded in every audit header
    pub model_version: String,
    pub default_risk_profile: RiskProfileId,
    /// Run control-arm decisions against the experiment candidate too
    pub shadow_mode: bool,
    pub history_capacity: usize,
    pub llm: LlmConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    pub model: String,
    /// Never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSONL audit log
    pub log_path: PathBuf,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            default_risk_profile: RiskProfileId::Balanced,
            shadow_mode: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            llm: LlmConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: EXECUTOR_TIMEOUT_SECS,
            temperature: EXECUTOR_TEMPERATURE,
            max_tokens: 600,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("./audit/ads_audit.jsonl"),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AdsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AdsError::Config(format!("Failed to parse TOML: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AdsError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Explicit path, else `ADS_CONFIG`, else defaults; then env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from any key lookup (environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_LLM_ENDPOINT).filter(|v| !v.is_empty()) {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_LLM_MODEL).filter(|v| !v.is_empty()) {
            self.llm.model = model;
        }
        if let Some(key) = lookup(ENV_LLM_API_KEY).filter(|v| !v.is_empty()) {
            self.llm.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(AdsError::Config("llm.timeout_secs must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AdsError::Config(format!(
                "llm.temperature {} outside [0, 2]",
                self.llm.temperature
            )));
        }
        if self.model_version.trim().is_empty() {
            return Err(AdsError::Config("model_version must not be empty".into()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
