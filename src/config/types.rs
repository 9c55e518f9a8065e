use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::RetryConfig;
use super::credentials::resolve_credential;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const BASE_URL_ENV: &str = "TAXOPS_API_URL";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TaxopsConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy for idempotent reads.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig { max_retries: self.max_retries, ..RetryConfig::default() }
    }
}

#[derive(Clone, Deserialize, Serialize, Default)]
pub struct SessionConfig {
    /// Where the bearer credential is kept between invocations.
    pub token_file: Option<PathBuf>,
    /// Literal token or `$ENV_VAR` reference.
    pub token: Option<String>,
    /// Demo mode: owner role in a demo firm, no network bootstrap.
    #[serde(default)]
    pub auth_bypass: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token_file", &self.token_file)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("auth_bypass", &self.auth_bypass)
            .finish()
    }
}

impl SessionConfig {
    pub fn token_path(&self) -> PathBuf {
        if let Some(path) = &self.token_file {
            return path.clone();
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".taxops").join("token")
    }

    /// Configured token with `$VAR` references resolved.
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .as_deref()
            .map(resolve_credential)
            .filter(|t| !t.trim().is_empty() && !t.starts_with('$'))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_color() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: OutputFormat::Text, color: true }
    }
}
