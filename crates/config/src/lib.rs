//! Configuration loading, validation, and management for Stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stepwise_core::state::{DEFAULT_MAX_ERRORS, DEFAULT_MAX_ITERATIONS, RunLimits};

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Loop limits and prompt settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Where shell commands run
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Path policy for the file tool
    #[serde(default)]
    pub files: FilePolicyConfig,

    /// Model endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("agent", &self.agent)
            .field("sandbox", &self.sandbox)
            .field("files", &self.files)
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_max_errors")]
    pub max_errors: u32,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_max_errors() -> u32 {
    DEFAULT_MAX_ERRORS
}

impl AgentSettings {
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            max_iterations: self.max_iterations,
            max_errors: self.max_errors,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_errors: default_max_errors(),
            system_prompt_override: None,
        }
    }
}

/// Which executor backs the `shell` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    /// `sh -c` on the host, scoped to the workspace directory
    Local,
    /// A throwaway `docker run --rm` container per command
    Docker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_kind")]
    pub kind: SandboxKind,

    /// Working directory for local execution (defaults to ~/.stepwise/workspace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    #[serde(default = "default_cpu_quota")]
    pub cpu_quota: u64,

    #[serde(default = "default_network")]
    pub network: String,
}

fn default_sandbox_kind() -> SandboxKind {
    SandboxKind::Docker
}
fn default_image() -> String {
    "ubuntu:22.04".into()
}
fn default_memory_limit() -> String {
    "512m".into()
}
fn default_cpu_quota() -> u64 {
    100_000
}
fn default_network() -> String {
    "bridge".into()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            kind: default_sandbox_kind(),
            workspace_dir: None,
            image: default_image(),
            memory_limit: default_memory_limit(),
            cpu_quota: default_cpu_quota(),
            network: default_network(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePolicyConfig {
    /// If non-empty, file paths must fall under one of these roots
    #[serde(default)]
    pub allowed_roots: Vec<String>,

    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,
}

fn default_forbidden_paths() -> Vec<String> {
    vec![
        "/etc".into(),
        "/proc".into(),
        "/sys".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws".into(),
    ]
}

impl Default for FilePolicyConfig {
    fn default() -> Self {
        Self {
            allowed_roots: vec![],
            forbidden_paths: default_forbidden_paths(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Override the API base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    ///
    /// Also checks environment variables:
    /// - `STEPWISE_API_KEY` (highest priority), `ANTHROPIC_API_KEY`, `CLAUDE_API_KEY`
    /// - `STEPWISE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("STEPWISE_API_KEY")
                .ok()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .or_else(|| std::env::var("CLAUDE_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("STEPWISE_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    /// Get the default workspace directory path.
    pub fn workspace_dir() -> PathBuf {
        Self::config_dir().join("workspace")
    }

    /// The directory local shell commands run in.
    pub fn sandbox_workspace(&self) -> PathBuf {
        self.sandbox
            .workspace_dir
            .clone()
            .unwrap_or_else(Self::workspace_dir)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 1.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if self.agent.max_errors == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_errors must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            agent: AgentSettings::default(),
            sandbox: SandboxConfig::default(),
            files: FilePolicyConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
