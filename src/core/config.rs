//! Runner configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables, then command-line flags via `apply_overrides`.
//! The API key is only ever taken from the environment.

use crate::core::error::{Result, RunnerError};
use serde::Deserialize;
use std::path::Path;

/// Default chat-completions endpoint
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Models tried in order until one answers
pub const DEFAULT_MODELS: [&str; 3] = ["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini"];

/// Environment variables checked for the credential, first match wins
pub const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "LLM_API_KEY"];

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Credential for the language-model endpoint
    pub api_key: Option<String>,

    /// Completion endpoint. URLs on anthropic.com use the messages format.
    pub api_url: String,

    /// Ordered model fallback list
    pub models: Vec<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Completion token cap. Routing answers are a few hundred tokens at most.
    pub max_tokens: u32,

    /// Simulator UDID to target; `None` means whichever is booted
    pub device: Option<String>,

    /// Physical device UDID; takes precedence over `device`
    pub physical_device: Option<String>,

    /// Resolve and print the deep link without launching anything
    pub dry_run: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.into(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 30,
            max_tokens: 512,
            device: None,
            physical_device: None,
            dry_run: false,
        }
    }
}

/// Values given on the command line; unset fields keep the lower layers
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub models: Vec<String>,
    pub device: Option<String>,
    pub physical_device: Option<String>,
    pub dry_run: bool,
}

/// On-disk shape of the config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_url: Option<String>,
    models: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    device: Option<String>,
    physical_device: Option<String>,
    dry_run: Option<bool>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the configuration from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Defaults, then the file at `path`, then `lookup` as the environment
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                RunnerError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            config.apply_toml(&content)?;
            tracing::debug!("Loaded config file {}", path.display());
        }
        config.apply_env(lookup);
        Ok(config)
    }

    /// Overlay command-line values, the last and strongest layer
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if !overrides.models.is_empty() {
            self.models = overrides.models.clone();
        }
        if overrides.device.is_some() {
            self.device = overrides.device.clone();
        }
        if overrides.physical_device.is_some() {
            self.physical_device = overrides.physical_device.clone();
        }
        self.dry_run |= overrides.dry_run;
    }

    /// Overlay values from TOML text
    pub fn apply_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)?;
        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if let Some(models) = file.models {
            self.models = models;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(tokens) = file.max_tokens {
            self.max_tokens = tokens;
        }
        if file.device.is_some() {
            self.device = file.device;
        }
        if file.physical_device.is_some() {
            self.physical_device = file.physical_device;
        }
        if let Some(dry_run) = file.dry_run {
            self.dry_run = dry_run;
        }
        Ok(())
    }

    /// Overlay values from environment lookups
    ///
    /// Takes the lookup as a closure so tests never touch the real process
    /// environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.api_key = API_KEY_VARS
            .iter()
            .filter_map(|var| lookup(var))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .or(self.api_key.take());

        if let Some(url) = lookup("LLM_API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }

        if let Some(models) = lookup("LLM_MODEL") {
            let models: Vec<String> = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !models.is_empty() {
                self.models = models;
            }
        }
    }

    /// The credential, or a configuration error naming the variables to set
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(RunnerError::Config(format!(
                "No API key found. Set it in your environment, e.g. export {}=\"your-key\"",
                API_KEY_VARS[0]
            ))),
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(RunnerError::Config("At least one model must be configured".into()));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(RunnerError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(RunnerError::Config("timeout_secs must be positive".into()));
        }

        if self.max_tokens == 0 {
            return Err(RunnerError::Config("max_tokens must be positive".into()));
        }

        Ok(())
    }
}
