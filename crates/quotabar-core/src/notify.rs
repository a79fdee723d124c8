//! Threshold-crossing alerts
//!
//! Each alert fires once when its condition starts to hold and re-arms
//! once the condition clears (typically after a billing period reset).

use quotabar_client::UsageSnapshot;
use serde::Serialize;

use crate::format::format_count;
use crate::state::usage_percentage;

/// A one-shot notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Usage reached the warning threshold
    ThresholdReached {
        /// Current usage percentage
        percentage: f64,
        /// Configured threshold
        threshold: f64,
    },
    /// Included allowance fully consumed
    QuotaExhausted {
        /// Units used
        used: f64,
        /// Included allowance
        total: f64,
    },
    /// Overage reached the configured budget
    BudgetExhausted {
        /// Overage units used
        used: f64,
        /// Overage budget
        total: f64,
    },
}

impl Alert {
    /// Notification text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Alert::ThresholdReached {
                percentage,
                threshold,
            } => format!(
                "Premium request usage is at {:.0}% (warning threshold {:.0}%).",
                percentage, threshold
            ),
            Alert::QuotaExhausted { used, total } => format!(
                "Included premium requests used up ({}/{}). Further requests count as overage.",
                format_count(*used),
                format_count(*total)
            ),
            Alert::BudgetExhausted { used, total } => format!(
                "Overage budget reached ({}/{} requests).",
                format_count(*used),
                format_count(*total)
            ),
        }
    }
}

/// Tracks which alerts have fired.
#[derive(Debug, Default)]
pub struct ThresholdNotifier {
    threshold_fired: bool,
    quota_fired: bool,
    budget_fired: bool,
}

impl ThresholdNotifier {
    /// Create a notifier with every alert armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a fresh snapshot with the fired alerts and return those that
    /// newly apply. When the quota is exhausted the threshold alert is
    /// folded into it.
    pub fn observe(&mut self, snapshot: &UsageSnapshot, threshold: f64) -> Vec<Alert> {
        let mut alerts = Vec::new();
        if snapshot.is_unlimited() {
            return alerts;
        }
        let Ok(pct) = usage_percentage(snapshot) else {
            return alerts;
        };

        let exhausted = pct >= 100.0;
        if exhausted && !self.quota_fired {
            alerts.push(Alert::QuotaExhausted {
                used: snapshot.included_used,
                total: snapshot.included_total,
            });
            self.threshold_fired = true;
        }
        self.quota_fired = exhausted;

        let over = pct >= threshold;
        if over && !self.threshold_fired {
            alerts.push(Alert::ThresholdReached {
                percentage: pct,
                threshold,
            });
        }
        self.threshold_fired = over;

        let budget_spent = snapshot.has_budget() && snapshot.budget_used >= snapshot.budget_total;
        if budget_spent && !self.budget_fired {
            alerts.push(Alert::BudgetExhausted {
                used: snapshot.budget_used,
                total: snapshot.budget_total,
            });
        }
        self.budget_fired = budget_spent;

        alerts
    }
}
