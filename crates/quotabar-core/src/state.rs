//! Display state determination
//!
//! Maps the current conditions (auth, subscription, error, data, threshold)
//! to exactly one [`DisplayState`]. Evaluation walks an ordered rule table
//! and stops at the first rule that applies.

use quotabar_client::{FetchError, UsageSnapshot};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// What the display surface should show. Variants are listed in
/// evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// No credential or the credential was rejected
    NoAuth,
    /// Authenticated but without a plan that reports premium requests
    NoSubscription,
    /// The last fetch failed
    Error,
    /// No data obtained yet
    Loading,
    /// Usage at or above the warning threshold
    Warning,
    /// Usage below the warning threshold
    Normal,
}

impl DisplayState {
    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAuth => "no_auth",
            Self::NoSubscription => "no_subscription",
            Self::Error => "error",
            Self::Loading => "loading",
            Self::Warning => "warning",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for one evaluation. Assembled per tick, never stored.
#[derive(Debug, Clone, Copy)]
pub struct StateConditions<'a> {
    /// Most recent snapshot, if any
    pub snapshot: Option<&'a UsageSnapshot>,
    /// Whether a usable credential exists
    pub is_authenticated: bool,
    /// Whether the account has a premium request plan
    pub has_subscription: bool,
    /// Failure from the current tick
    pub error: Option<&'a FetchError>,
    /// Warning threshold in percent, 0 to 100
    pub warning_threshold: f64,
}

/// One row of the decision table.
#[derive(Clone, Copy)]
pub struct Rule {
    /// State produced when the rule applies
    pub state: DisplayState,
    /// Predicate over the conditions
    pub applies: fn(&StateConditions<'_>) -> bool,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("state", &self.state).finish()
    }
}

/// Decision table in priority order.
pub const RULES: [Rule; 7] = [
    Rule {
        state: DisplayState::NoAuth,
        applies: not_authenticated,
    },
    Rule {
        state: DisplayState::NoSubscription,
        applies: not_subscribed,
    },
    Rule {
        state: DisplayState::Error,
        applies: has_error,
    },
    Rule {
        state: DisplayState::Loading,
        applies: no_snapshot,
    },
    Rule {
        state: DisplayState::Error,
        applies: invalid_snapshot,
    },
    Rule {
        state: DisplayState::Warning,
        applies: over_threshold,
    },
    Rule {
        state: DisplayState::Normal,
        applies: always,
    },
];

fn not_authenticated(c: &StateConditions<'_>) -> bool {
    !c.is_authenticated
}

fn not_subscribed(c: &StateConditions<'_>) -> bool {
    !c.has_subscription
}

fn has_error(c: &StateConditions<'_>) -> bool {
    c.error.is_some()
}

fn no_snapshot(c: &StateConditions<'_>) -> bool {
    c.snapshot.is_none()
}

fn invalid_snapshot(c: &StateConditions<'_>) -> bool {
    match c.snapshot.map(validate_usage_data) {
        Some(Err(e)) => {
            error!(error = %e, "Usage snapshot failed validation");
            true
        }
        _ => false,
    }
}

fn over_threshold(c: &StateConditions<'_>) -> bool {
    c.snapshot.is_some_and(|s| {
        is_warning_threshold_exceeded(s, c.warning_threshold).unwrap_or(false)
    })
}

fn always(_: &StateConditions<'_>) -> bool {
    true
}

// ============================================================================
// Evaluation
// ============================================================================

/// Determine the display state using [`RULES`].
#[must_use]
pub fn determine_state(conditions: &StateConditions<'_>) -> DisplayState {
    determine_state_with(&RULES, conditions)
}

/// Determine the display state with an explicit rule table. Falls back to
/// `Normal` if no rule applies.
#[must_use]
pub fn determine_state_with(rules: &[Rule], conditions: &StateConditions<'_>) -> DisplayState {
    rules
        .iter()
        .find(|rule| (rule.applies)(conditions))
        .map_or(DisplayState::Normal, |rule| rule.state)
}

/// Reject snapshots that would make the usage percentage meaningless.
pub fn validate_usage_data(snapshot: &UsageSnapshot) -> Result<()> {
    if !snapshot.included_total.is_finite() || snapshot.included_total <= 0.0 {
        return Err(Error::Validation(format!(
            "included_total must be positive, got {}",
            snapshot.included_total
        )));
    }
    if !snapshot.included_used.is_finite() || snapshot.included_used < 0.0 {
        return Err(Error::Validation(format!(
            "included_used must not be negative, got {}",
            snapshot.included_used
        )));
    }
    if !snapshot.budget_used.is_finite() || snapshot.budget_used < 0.0 {
        return Err(Error::Validation(format!(
            "budget_used must not be negative, got {}",
            snapshot.budget_used
        )));
    }
    Ok(())
}

/// Included usage as a percentage of the included allowance.
pub fn usage_percentage(snapshot: &UsageSnapshot) -> Result<f64> {
    validate_usage_data(snapshot)?;
    Ok(snapshot.included_used * 100.0 / snapshot.included_total)
}

/// Whether usage is at or above `threshold` percent. Unlimited plans never
/// exceed the threshold.
pub fn is_warning_threshold_exceeded(snapshot: &UsageSnapshot, threshold: f64) -> Result<bool> {
    let pct = usage_percentage(snapshot)?;
    if snapshot.is_unlimited() {
        return Ok(false);
    }
    Ok(pct >= threshold)
}

// ============================================================================
// Transitions
// ============================================================================

/// Whether moving from `from` to `to` is permitted.
///
/// Advisory only: every transition is permitted. Callers use
/// [`is_redundant_transition`] to skip re-rendering an unchanged state.
#[must_use]
pub fn is_valid_transition(from: DisplayState, to: DisplayState) -> bool {
    use DisplayState as S;

    match (from, to) {
        (_, S::Error) => true,
        (S::Loading, _) => true,
        (S::Warning | S::Normal, S::Warning | S::Normal) => true,
        (_, S::NoAuth | S::NoSubscription) => true,
        // Recovery after sign-in, plan change or a successful retry
        (S::NoAuth | S::NoSubscription | S::Error, _) => true,
        (S::Warning | S::Normal, S::Loading) => true,
    }
}

/// Whether `to` repeats the previously displayed state.
#[must_use]
pub fn is_redundant_transition(from: Option<DisplayState>, to: DisplayState) -> bool {
    from == Some(to)
}
