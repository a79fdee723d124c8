//! User-facing usage settings

use quotabar_client::BudgetConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};

/// Shortest allowed refresh interval in seconds.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 30;
/// Longest allowed refresh interval in seconds.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 3600;
/// Default refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
/// Default warning threshold in percent.
pub const DEFAULT_WARNING_THRESHOLD: f64 = 90.0;

/// Polling and alerting settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSettings {
    /// Seconds between automatic refreshes, 30 to 3600
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Usage percentage at which the warning state starts, 0 to 100
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
    /// Overage budget in dollars
    #[serde(default)]
    pub budget_dollars: f64,
    /// Overage budget in requests, used only when `budget_dollars` is 0
    #[serde(default)]
    pub budget_requests: f64,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_warning_threshold() -> f64 {
    DEFAULT_WARNING_THRESHOLD
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            warning_threshold: default_warning_threshold(),
            budget_dollars: 0.0,
            budget_requests: 0.0,
        }
    }
}

impl UsageSettings {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS)
            .contains(&self.refresh_interval)
        {
            return Err(invalid(
                "refresh_interval",
                format!(
                    "must be between {} and {} seconds, got {}",
                    MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS, self.refresh_interval
                ),
            ));
        }
        if !(0.0..=100.0).contains(&self.warning_threshold) {
            return Err(invalid(
                "warning_threshold",
                format!("must be between 0 and 100, got {}", self.warning_threshold),
            ));
        }
        if self.budget_dollars.is_nan() || self.budget_dollars < 0.0 {
            return Err(invalid(
                "budget_dollars",
                format!("must not be negative, got {}", self.budget_dollars),
            ));
        }
        if self.budget_requests.is_nan() || self.budget_requests < 0.0 {
            return Err(invalid(
                "budget_requests",
                format!("must not be negative, got {}", self.budget_requests),
            ));
        }
        Ok(())
    }

    /// Clamp out-of-range values into range, logging each adjustment.
    #[must_use]
    pub fn sanitized(self) -> Self {
        if let Err(e) = self.validate() {
            warn!(error = %e, "Adjusting out-of-range usage settings");
        }

        let warning_threshold = if self.warning_threshold.is_nan() {
            DEFAULT_WARNING_THRESHOLD
        } else {
            self.warning_threshold.clamp(0.0, 100.0)
        };

        Self {
            refresh_interval: self
                .refresh_interval
                .clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS),
            warning_threshold,
            budget_dollars: non_negative(self.budget_dollars),
            budget_requests: non_negative(self.budget_requests),
        }
    }

    /// Refresh interval as a duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    /// Overage budget passed to the fetch client.
    #[must_use]
    pub fn budget(&self) -> BudgetConfig {
        BudgetConfig {
            budget_dollars: self.budget_dollars,
            budget_requests: self.budget_requests,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn invalid(field: &str, message: String) -> Error {
    Error::InvalidConfig {
        field: field.to_string(),
        message,
    }
}
