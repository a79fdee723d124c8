//! Credential sources
//!
//! Tokens are looked up on every trigger so that signing in or out with
//! the GitHub CLI is picked up without a restart.
//!
//! Supported:
//! - Environment variables (`QUOTABAR_TOKEN`, `GITHUB_TOKEN`, `GH_TOKEN`)
//! - GitHub CLI: `gh auth token`

use std::sync::Arc;

use async_trait::async_trait;
use quotabar_client::Credential;
use quotabar_core::AuthProvider;
use tracing::debug;

use crate::config::AuthConfig;

// ============================================================================
// Environment
// ============================================================================

/// Reads the first non-empty variable from a list.
#[derive(Debug, Clone)]
pub struct EnvAuthProvider {
    vars: Vec<String>,
}

impl EnvAuthProvider {
    pub fn new(vars: Vec<String>) -> Self {
        Self { vars }
    }

    fn lookup(&self) -> Option<(&str, String)> {
        self.vars.iter().find_map(|var| {
            let value = std::env::var(var).ok()?;
            let value = value.trim();
            (!value.is_empty()).then(|| (var.as_str(), value.to_string()))
        })
    }
}

#[async_trait]
impl AuthProvider for EnvAuthProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn credential(&self) -> Option<Credential> {
        let (var, token) = self.lookup()?;
        debug!(var, "Using token from environment");
        Some(Credential::new(token))
    }
}

// ============================================================================
// GitHub CLI
// ============================================================================

/// Asks the GitHub CLI for its stored token.
#[derive(Debug, Clone)]
pub struct GhCliAuthProvider {
    program: String,
}

impl Default for GhCliAuthProvider {
    fn default() -> Self {
        Self {
            program: "gh".to_string(),
        }
    }
}

impl GhCliAuthProvider {
    /// Use a different executable in place of `gh`.
    #[cfg(test)]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn token(&self) -> anyhow::Result<String> {
        use tokio::process::Command;

        let output = Command::new(&self.program)
            .args(["auth", "token"])
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("{} not found ({})", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("`{} auth token` failed: {}", self.program, stderr.trim());
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            anyhow::bail!("{} returned empty token", self.program);
        }
        Ok(token)
    }
}

#[async_trait]
impl AuthProvider for GhCliAuthProvider {
    fn name(&self) -> &str {
        "gh-cli"
    }

    async fn credential(&self) -> Option<Credential> {
        match self.token().await {
            Ok(token) => Some(Credential::new(token)),
            Err(e) => {
                debug!(error = %e, "GitHub CLI token unavailable");
                None
            }
        }
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Tries each provider in order and returns the first credential.
#[derive(Clone, Default)]
pub struct ChainAuthProvider {
    providers: Vec<Arc<dyn AuthProvider>>,
}

impl ChainAuthProvider {
    pub fn new(providers: Vec<Arc<dyn AuthProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain described by the auth section of the config.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut providers: Vec<Arc<dyn AuthProvider>> = Vec::new();
        if !config.token_env.is_empty() {
            providers.push(Arc::new(EnvAuthProvider::new(config.token_env.clone())));
        }
        if config.use_gh_cli {
            providers.push(Arc::new(GhCliAuthProvider::default()));
        }
        Self::new(providers)
    }

    /// Names of the providers, in lookup order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl AuthProvider for ChainAuthProvider {
    fn name(&self) -> &str {
        "chain"
    }

    async fn credential(&self) -> Option<Credential> {
        for provider in &self.providers {
            if let Some(credential) = provider.credential().await {
                debug!(provider = provider.name(), "Credential resolved");
                return Some(credential);
            }
        }
        None
    }
}
