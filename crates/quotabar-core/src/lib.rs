//! Quotabar Core - usage state and monitoring
//!
//! This crate turns fetched usage into something a display can show:
//! - State: priority-ordered display state engine and transition checks
//! - Settings: refresh interval, warning threshold and overage budget
//! - Format: status line and tooltip text
//! - Notify: one-shot threshold and exhaustion alerts
//! - Monitor: per-trigger refresh loop over auth, client and display

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod monitor;
pub mod notify;
pub mod settings;
pub mod state;

pub use error::{format_error_for_display, Error, Result, UserFriendlyError};
pub use format::{format_count, format_duration, format_status_text, format_tooltip, Rendered};
pub use monitor::{AuthProvider, DisplaySurface, Evaluation, UsageMonitor};
pub use notify::{Alert, ThresholdNotifier};
pub use settings::{
    UsageSettings, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_WARNING_THRESHOLD,
    MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS,
};
pub use state::{
    determine_state, determine_state_with, is_redundant_transition, is_valid_transition,
    is_warning_threshold_exceeded, usage_percentage, validate_usage_data, DisplayState, Rule,
    StateConditions, RULES,
};
