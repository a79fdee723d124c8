//! Usage snapshot and quota document normalization
//!
//! The quota endpoint reports an allowance section per usage category.
//! This module turns the premium-request section into a [`UsageSnapshot`].

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sentinel included allowance for unlimited plans.
pub const UNLIMITED_TOTAL: f64 = f64::MAX;

/// Premium requests bought by one dollar of overage budget ($0.04/request).
pub const REQUESTS_PER_DOLLAR: f64 = 25.0;

// ============================================================================
// Wire types
// ============================================================================

/// Quota document returned by the endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaDocument {
    /// Plan name (e.g. "individual", "business")
    #[serde(default)]
    pub copilot_plan: Option<String>,
    /// Start of the next billing period
    #[serde(default)]
    pub quota_reset_date: Option<String>,
    /// Allowance sections keyed by usage category
    #[serde(default)]
    pub quota_snapshots: Option<QuotaSnapshots>,
}

/// Allowance sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaSnapshots {
    /// Premium request allowance
    #[serde(default)]
    pub premium_interactions: Option<QuotaAllowance>,
}

/// A single allowance record.
///
/// `unlimited` is kept as an `Option` so an absent flag and an explicit
/// `false` stay distinguishable from `true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaAllowance {
    /// Included units for the billing period
    #[serde(default)]
    pub entitlement: Option<f64>,
    /// Units left; negative once in overage
    #[serde(default)]
    pub remaining: Option<f64>,
    /// Plan has no included-units ceiling
    #[serde(default)]
    pub unlimited: Option<bool>,
    /// Overage ceiling reported by the service
    #[serde(default)]
    pub overage_limit: Option<f64>,
    /// Overage counter reported by the service. Known to be unreliable and
    /// never used for `budget_used`.
    #[serde(default)]
    pub overage_count: Option<f64>,
    /// Whether overage is permitted at all
    #[serde(default)]
    pub overage_permitted: Option<bool>,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Normalized premium request usage for one fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    /// Units consumed within the included allowance
    pub included_used: f64,
    /// Included allowance, [`UNLIMITED_TOTAL`] for unlimited plans
    pub included_total: f64,
    /// Units consumed beyond the included allowance
    pub budget_used: f64,
    /// Overage ceiling, 0 when none is configured
    pub budget_total: f64,
    /// When this snapshot was captured
    pub last_refresh_time: DateTime<Utc>,
    /// When the included allowance resets
    pub billing_period_end: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Whether this snapshot represents an unlimited plan.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.included_total >= UNLIMITED_TOTAL
    }

    /// Whether an overage budget is configured.
    #[must_use]
    pub fn has_budget(&self) -> bool {
        self.budget_total > 0.0
    }
}

/// User-configured overage budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Monetary budget, converted at [`REQUESTS_PER_DOLLAR`]
    #[serde(default)]
    pub budget_dollars: f64,
    /// Unit budget, used only when `budget_dollars` is 0
    #[serde(default)]
    pub budget_requests: f64,
}

/// Resolve the overage ceiling.
///
/// Precedence: positive upstream value, then the monetary budget, then the
/// unit budget, then zero.
#[must_use]
pub fn resolve_budget_total(upstream: Option<f64>, budget: &BudgetConfig) -> f64 {
    match upstream {
        Some(limit) if limit > 0.0 => limit,
        _ if budget.budget_dollars > 0.0 => budget.budget_dollars * REQUESTS_PER_DOLLAR,
        _ if budget.budget_requests > 0.0 => budget.budget_requests,
        _ => 0.0,
    }
}

/// Convert a quota document into a snapshot captured at `now`.
pub fn normalize(
    doc: &QuotaDocument,
    budget: &BudgetConfig,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot> {
    let allowance = doc
        .quota_snapshots
        .as_ref()
        .and_then(|s| s.premium_interactions.as_ref())
        .ok_or_else(|| FetchError::validation("missing quota data"))?;

    let billing_period_end = doc
        .quota_reset_date
        .as_deref()
        .and_then(parse_reset_date)
        .unwrap_or_else(|| start_of_next_month(now));
    let budget_total = resolve_budget_total(allowance.overage_limit, budget);

    if allowance.unlimited == Some(true) {
        return Ok(UsageSnapshot {
            included_used: 0.0,
            included_total: UNLIMITED_TOTAL,
            budget_used: 0.0,
            budget_total,
            last_refresh_time: now,
            billing_period_end,
        });
    }

    let entitlement = allowance
        .entitlement
        .ok_or_else(|| FetchError::validation("quota data missing entitlement"))?;
    let remaining = allowance
        .remaining
        .ok_or_else(|| FetchError::validation("quota data missing remaining"))?;

    if !entitlement.is_finite() || entitlement <= 0.0 {
        return Err(FetchError::validation(format!(
            "entitlement must be positive, got {}",
            entitlement
        )));
    }

    // Overage is derived from the included counters; the upstream
    // overage_count is not trusted.
    let used = entitlement - remaining;
    Ok(UsageSnapshot {
        included_used: used.max(0.0),
        included_total: entitlement,
        budget_used: (used - entitlement).max(0.0),
        budget_total,
        last_refresh_time: now,
        billing_period_end,
    })
}

/// Parse a reset date given as RFC 3339 or a bare `YYYY-MM-DD`.
#[must_use]
pub fn parse_reset_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn start_of_next_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn doc(json: &str) -> QuotaDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_regular_plan() {
        let d = doc(r#"{
            "copilot_plan": "individual",
            "quota_reset_date": "2026-04-01",
            "quota_snapshots": {
                "premium_interactions": { "entitlement": 300, "remaining": 15, "unlimited": false }
            }
        }"#);

        let snap = normalize(&d, &BudgetConfig::default(), now()).unwrap();
        assert_eq!(snap.included_used, 285.0);
        assert_eq!(snap.included_total, 300.0);
        assert_eq!(snap.budget_used, 0.0);
        assert_eq!(snap.budget_total, 0.0);
        assert_eq!(snap.last_refresh_time, now());
        assert_eq!(
            snap.billing_period_end,
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_overage_recomputed_from_remaining() {
        let d = doc(r#"{
            "quota_snapshots": {
                "premium_interactions": {
                    "entitlement": 300, "remaining": -42, "overage_count": 7
                }
            }
        }"#);

        let snap = normalize(&d, &BudgetConfig::default(), now()).unwrap();
        assert_eq!(snap.included_used, 342.0);
        assert_eq!(snap.budget_used, 42.0);
    }

    #[test]
    fn test_unlimited_plan() {
        let d = doc(r#"{
            "quota_snapshots": { "premium_interactions": { "unlimited": true } }
        }"#);

        let snap = normalize(&d, &BudgetConfig::default(), now()).unwrap();
        assert_eq!(snap.included_used, 0.0);
        assert_eq!(snap.included_total, UNLIMITED_TOTAL);
        assert!(snap.is_unlimited());
    }

    #[test]
    fn test_missing_section_is_validation_error() {
        let d = doc(r#"{ "quota_snapshots": {} }"#);
        let err = normalize(&d, &BudgetConfig::default(), now()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert!(err.message().contains("missing quota data"));

        let d = doc("{}");
        assert!(normalize(&d, &BudgetConfig::default(), now()).is_err());
    }

    #[test]
    fn test_missing_counters_without_unlimited() {
        let d = doc(r#"{
            "quota_snapshots": { "premium_interactions": { "entitlement": 300, "unlimited": false } }
        }"#);
        let err = normalize(&d, &BudgetConfig::default(), now()).unwrap_err();
        assert!(err.message().contains("remaining"));

        let d = doc(r#"{
            "quota_snapshots": { "premium_interactions": { "remaining": 10 } }
        }"#);
        let err = normalize(&d, &BudgetConfig::default(), now()).unwrap_err();
        assert!(err.message().contains("entitlement"));
    }

    #[test]
    fn test_zero_entitlement_rejected() {
        let d = doc(r#"{
            "quota_snapshots": { "premium_interactions": { "entitlement": 0, "remaining": 0 } }
        }"#);
        let err = normalize(&d, &BudgetConfig::default(), now()).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_budget_precedence() {
        let both = BudgetConfig {
            budget_dollars: 20.0,
            budget_requests: 100.0,
        };
        assert_eq!(resolve_budget_total(None, &both), 500.0);
        assert_eq!(resolve_budget_total(Some(0.0), &both), 500.0);
        assert_eq!(resolve_budget_total(Some(750.0), &both), 750.0);

        let requests_only = BudgetConfig {
            budget_dollars: 0.0,
            budget_requests: 100.0,
        };
        assert_eq!(resolve_budget_total(None, &requests_only), 100.0);
        assert_eq!(resolve_budget_total(None, &BudgetConfig::default()), 0.0);
    }

    #[test]
    fn test_reset_date_formats() {
        assert_eq!(
            parse_reset_date("2026-04-01T00:00:00Z"),
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).single()
        );
        assert_eq!(
            parse_reset_date("2026-04-01"),
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).single()
        );
        assert!(parse_reset_date("next month").is_none());
    }

    #[test]
    fn test_missing_reset_date_defaults_to_next_month() {
        let december = Utc.with_ymd_and_hms(2026, 12, 20, 8, 0, 0).unwrap();
        assert_eq!(
            start_of_next_month(december),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
