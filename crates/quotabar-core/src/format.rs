//! Status text and tooltip formatting

use chrono::{DateTime, Utc};
use quotabar_client::{FetchError, UsageSnapshot};
use serde::Serialize;

use crate::error::format_error_for_display;
use crate::state::{usage_percentage, DisplayState};

const LABEL: &str = "Copilot";

/// What the display surface receives for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    /// Evaluated state
    pub state: DisplayState,
    /// One-line status text
    pub text: String,
    /// Multi-line detail text
    pub tooltip: String,
}

impl Rendered {
    /// Format the state together with its data.
    #[must_use]
    pub fn new(
        state: DisplayState,
        snapshot: Option<&UsageSnapshot>,
        error: Option<&FetchError>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            state,
            text: format_status_text(state, snapshot),
            tooltip: format_tooltip(state, snapshot, error, now),
        }
    }
}

/// One-line status, e.g. `Copilot: 150/300 (50%)`.
#[must_use]
pub fn format_status_text(state: DisplayState, snapshot: Option<&UsageSnapshot>) -> String {
    match (state, snapshot) {
        (DisplayState::NoAuth, _) => format!("{}: sign in", LABEL),
        (DisplayState::NoSubscription, _) => format!("{}: no subscription", LABEL),
        (DisplayState::Error, _) => format!("{}: error", LABEL),
        (DisplayState::Loading, _) | (_, None) => format!("{}: loading…", LABEL),
        (DisplayState::Warning | DisplayState::Normal, Some(s)) => {
            let marker = if state == DisplayState::Warning {
                "⚠ "
            } else {
                ""
            };
            format!("{}{}: {}", marker, LABEL, format_usage(s))
        }
    }
}

fn format_usage(snapshot: &UsageSnapshot) -> String {
    if snapshot.is_unlimited() {
        return "unlimited".to_string();
    }
    let pct = usage_percentage(snapshot).unwrap_or(0.0);
    let mut text = format!(
        "{}/{} ({:.0}%)",
        format_count(snapshot.included_used.min(snapshot.included_total)),
        format_count(snapshot.included_total),
        pct.min(100.0)
    );
    if snapshot.budget_used > 0.0 {
        text.push_str(&format!(" +{}", format_count(snapshot.budget_used)));
    }
    text
}

/// Multi-line detail text.
#[must_use]
pub fn format_tooltip(
    state: DisplayState,
    snapshot: Option<&UsageSnapshot>,
    error: Option<&FetchError>,
    now: DateTime<Utc>,
) -> String {
    match state {
        DisplayState::NoAuth => {
            "Not signed in.\nRun `gh auth login` or set GITHUB_TOKEN to track premium requests."
                .to_string()
        }
        DisplayState::NoSubscription => {
            "No premium request quota for this account.\nCheck that your account has an active Copilot subscription."
                .to_string()
        }
        DisplayState::Error => match error {
            Some(e) => format_error_for_display(e),
            None => "Usage data is invalid.".to_string(),
        },
        DisplayState::Loading => "Fetching premium request usage…".to_string(),
        DisplayState::Warning | DisplayState::Normal => match snapshot {
            Some(s) => format_usage_details(s, now),
            None => "Fetching premium request usage…".to_string(),
        },
    }
}

fn format_usage_details(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> String {
    let mut lines = Vec::with_capacity(4);

    if snapshot.is_unlimited() {
        lines.push("Premium requests: unlimited".to_string());
    } else {
        let pct = usage_percentage(snapshot).unwrap_or(0.0);
        lines.push(format!(
            "Premium requests: {} of {} used ({:.1}%)",
            format_count(snapshot.included_used.min(snapshot.included_total)),
            format_count(snapshot.included_total),
            pct
        ));
    }

    if snapshot.has_budget() {
        lines.push(format!(
            "Overage: {} of {} budget",
            format_count(snapshot.budget_used),
            format_count(snapshot.budget_total)
        ));
    } else if snapshot.budget_used > 0.0 {
        lines.push(format!(
            "Overage: {} (no overage budget)",
            format_count(snapshot.budget_used)
        ));
    } else {
        lines.push("Overage: no overage budget".to_string());
    }

    lines.push(format!(
        "Resets {} (in {})",
        snapshot.billing_period_end.format("%Y-%m-%d"),
        format_duration(&(snapshot.billing_period_end - now))
    ));
    lines.push(format!(
        "Updated {}",
        snapshot.last_refresh_time.format("%H:%M:%S UTC")
    ));

    lines.join("\n")
}

/// Format a unit count, dropping the fraction when it is whole.
#[must_use]
pub fn format_count(n: f64) -> String {
    if (n - n.round()).abs() < 0.005 {
        format!("{:.0}", n)
    } else {
        format!("{:.2}", n)
    }
}

/// Format a chrono::Duration as "Xd Yh", "Xh Ym" or "Xm".
#[must_use]
pub fn format_duration(d: &chrono::Duration) -> String {
    let total_secs = d.num_seconds();
    if total_secs <= 0 {
        return "now".to_string();
    }
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let mins = (total_secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {:02}m", hours, mins)
    } else {
        format!("{}m", mins.max(1))
    }
}
