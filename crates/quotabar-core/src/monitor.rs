//! Usage monitor
//!
//! Glues the collaborators together for each trigger: asks the auth
//! provider for a credential, fetches through the single-flight client,
//! evaluates the display state and hands the result to the display surface.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use quotabar_client::{Credential, ErrorKind, FetchError, RequestOptions, UsageClient, UsageSnapshot};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::format::Rendered;
use crate::notify::{Alert, ThresholdNotifier};
use crate::settings::UsageSettings;
use crate::state::{
    determine_state, is_redundant_transition, is_valid_transition, DisplayState, StateConditions,
};

/// Source of the bearer credential.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Current credential, or `None` when signed out.
    async fn credential(&self) -> Option<Credential>;
}

/// Sink for evaluated states and alerts.
pub trait DisplaySurface: Send + Sync {
    /// Show a new state.
    fn render(&self, rendered: &Rendered);

    /// Show a one-shot alert.
    fn notify(&self, alert: &Alert);
}

/// Outcome of one trigger.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Formatted state
    pub rendered: Rendered,
    /// Snapshot the state was computed from
    pub snapshot: Option<Arc<UsageSnapshot>>,
    /// Failure from this trigger
    pub error: Option<FetchError>,
}

/// Drives refreshes and publishes results.
pub struct UsageMonitor {
    client: UsageClient,
    auth: Arc<dyn AuthProvider>,
    display: Arc<dyn DisplaySurface>,
    settings: UsageSettings,
    options: RequestOptions,
    notifier: Mutex<ThresholdNotifier>,
    previous: Mutex<Option<Rendered>>,
}

impl UsageMonitor {
    /// Create a monitor. Settings are sanitized; the overage budget is
    /// taken from them.
    #[must_use]
    pub fn new(
        client: UsageClient,
        auth: Arc<dyn AuthProvider>,
        display: Arc<dyn DisplaySurface>,
        settings: UsageSettings,
    ) -> Self {
        let settings = settings.sanitized();
        Self {
            client,
            auth,
            display,
            settings,
            options: RequestOptions::default().with_budget(settings.budget()),
            notifier: Mutex::new(ThresholdNotifier::new()),
            previous: Mutex::new(None),
        }
    }

    /// Builder: override timeout and retry options. The budget always comes
    /// from the settings.
    #[must_use]
    pub fn with_request_options(mut self, options: RequestOptions) -> Self {
        self.options = options.with_budget(self.settings.budget());
        self
    }

    /// Effective settings.
    #[must_use]
    pub fn settings(&self) -> &UsageSettings {
        &self.settings
    }

    /// Fetch and evaluate without publishing.
    pub async fn evaluate(&self) -> Evaluation {
        let Some(token) = self.auth.credential().await else {
            debug!(provider = self.auth.name(), "No credential available");
            return self.build(None, None, false, true);
        };

        match self.client.fetch(&token, &self.options).await {
            Ok(snapshot) => self.build(Some(snapshot), None, true, true),
            Err(err) => {
                let (is_authenticated, has_subscription) = match err.kind() {
                    ErrorKind::Auth => (false, true),
                    ErrorKind::Forbidden | ErrorKind::NotFound => (true, false),
                    _ => (true, true),
                };
                warn!(kind = %err.kind(), error = %err, "Quota refresh failed");
                self.build(
                    self.client.last_snapshot(),
                    Some(err),
                    is_authenticated,
                    has_subscription,
                )
            }
        }
    }

    /// Handle one trigger: evaluate, then publish to the display surface.
    pub async fn refresh(&self) -> Evaluation {
        let evaluation = self.evaluate().await;
        self.publish(&evaluation);
        evaluation
    }

    /// Refresh on every interval tick and every manual trigger until
    /// `shutdown` is cancelled. The first tick fires immediately.
    pub async fn run(&self, shutdown: CancellationToken, mut manual: mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(self.settings.refresh_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut manual_open = true;

        info!(
            interval_secs = self.settings.refresh_interval,
            warning_threshold = self.settings.warning_threshold,
            "Usage monitor started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Usage monitor shutting down");
                    return;
                }
                _ = interval.tick() => {
                    self.refresh().await;
                }
                trigger = manual.recv(), if manual_open => {
                    match trigger {
                        Some(()) => {
                            debug!("Manual refresh requested");
                            self.refresh().await;
                            interval.reset();
                        }
                        None => manual_open = false,
                    }
                }
            }
        }
    }

    fn build(
        &self,
        snapshot: Option<Arc<UsageSnapshot>>,
        error: Option<FetchError>,
        is_authenticated: bool,
        has_subscription: bool,
    ) -> Evaluation {
        let conditions = StateConditions {
            snapshot: snapshot.as_deref(),
            is_authenticated,
            has_subscription,
            error: error.as_ref(),
            warning_threshold: self.settings.warning_threshold,
        };
        let state = determine_state(&conditions);
        let rendered = Rendered::new(state, snapshot.as_deref(), error.as_ref(), Utc::now());
        Evaluation {
            rendered,
            snapshot,
            error,
        }
    }

    fn publish(&self, evaluation: &Evaluation) {
        let rendered = &evaluation.rendered;
        {
            let mut previous = lock(&self.previous);
            let previous_state = previous.as_ref().map(|r| r.state);

            if let Some(from) = previous_state {
                if !is_valid_transition(from, rendered.state) {
                    warn!(%from, to = %rendered.state, "Unexpected display state transition");
                }
            }

            if previous.as_ref() == Some(rendered) {
                debug!(state = %rendered.state, "Display unchanged, skipping render");
            } else {
                if !is_redundant_transition(previous_state, rendered.state) {
                    info!(
                        from = previous_state.map_or("none", DisplayState::as_str),
                        to = %rendered.state,
                        "Display state changed"
                    );
                }
                self.display.render(rendered);
                *previous = Some(rendered.clone());
            }
        }

        if matches!(rendered.state, DisplayState::Warning | DisplayState::Normal) {
            if let Some(snapshot) = evaluation.snapshot.as_deref() {
                let alerts = lock(&self.notifier).observe(snapshot, self.settings.warning_threshold);
                for alert in &alerts {
                    info!(alert = %alert.message(), "Usage alert");
                    self.display.notify(alert);
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
