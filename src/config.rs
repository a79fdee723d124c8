//! Application configuration types

use quotabar_client::{RequestOptions, RetryPolicy, DEFAULT_ENDPOINT};
use quotabar_core::UsageSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub usage: UsageSettings,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Quota endpoint and request behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            user_agent: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl EndpointConfig {
    /// Timeout and retry options for the fetch client.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_retry(RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
            })
    }
}

fn default_url() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

/// Where credentials come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variables checked in order
    #[serde(default = "default_token_env")]
    pub token_env: Vec<String>,
    /// Fall back to `gh auth token`
    #[serde(default = "default_true")]
    pub use_gh_cli: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            use_gh_cli: true,
        }
    }
}

fn default_token_env() -> Vec<String> {
    ["QUOTABAR_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}
