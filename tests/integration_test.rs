//! Integration tests for quotabar
//!
//! These tests drive the crates together through a scripted transport:
//! - quotabar-client: single-flight fetch, retry, normalization
//! - quotabar-core: state engine, formatting, alerts, monitor

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use quotabar_client::{
    normalize, BudgetConfig, Credential, ErrorKind, HttpResponse, QuotaDocument, QuotaTransport,
    RequestOptions, UsageClient, UNLIMITED_TOTAL,
};
use quotabar_core::{
    determine_state, Alert, AuthProvider, DisplayState, DisplaySurface, Rendered, StateConditions,
    UsageMonitor, UsageSettings,
};

// ============================================================================
// Fakes
// ============================================================================

struct ScriptedTransport {
    responses: Mutex<VecDeque<(u16, String)>>,
    calls: AtomicUsize,
    latency: Duration,
}

impl ScriptedTransport {
    fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
        Self::with_latency(responses, Duration::ZERO)
    }

    fn with_latency(responses: Vec<(u16, &str)>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            latency,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaTransport for ScriptedTransport {
    async fn get(
        &self,
        _token: &Credential,
        _timeout: Duration,
    ) -> quotabar_client::Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport script exhausted");
        Ok(HttpResponse { status, body })
    }
}

struct SignedIn;

#[async_trait]
impl AuthProvider for SignedIn {
    fn name(&self) -> &str {
        "test"
    }

    async fn credential(&self) -> Option<Credential> {
        Some(Credential::new("ghu_integration"))
    }
}

#[derive(Default)]
struct Recorder {
    renders: Mutex<Vec<Rendered>>,
    alerts: Mutex<Vec<Alert>>,
}

impl DisplaySurface for Recorder {
    fn render(&self, rendered: &Rendered) {
        self.renders.lock().unwrap().push(rendered.clone());
    }

    fn notify(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

fn monitor(
    transport: Arc<ScriptedTransport>,
    settings: UsageSettings,
) -> (UsageMonitor, Arc<Recorder>) {
    let display = Arc::new(Recorder::default());
    let monitor = UsageMonitor::new(
        UsageClient::new(transport),
        Arc::new(SignedIn),
        display.clone(),
        settings,
    );
    (monitor, display)
}

const NORMAL: &str = r#"{"quota_snapshots":{"premium_interactions":{"entitlement":300,"remaining":150}}}"#;
const UNLIMITED: &str =
    r#"{"copilot_plan":"enterprise","quota_snapshots":{"premium_interactions":{"unlimited":true}}}"#;
const OVERAGE: &str = r#"{"quota_reset_date":"2026-04-01","quota_snapshots":{"premium_interactions":{"entitlement":300,"remaining":-42,"overage_count":7}}}"#;

// ============================================================================
// End-to-end refresh
// ============================================================================

#[tokio::test]
async fn test_normal_usage_end_to_end() {
    let transport = ScriptedTransport::new(vec![(200, NORMAL)]);
    let (monitor, display) = monitor(transport.clone(), UsageSettings::default());

    let evaluation = monitor.refresh().await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(evaluation.rendered.state, DisplayState::Normal);
    assert_eq!(evaluation.rendered.text, "Copilot: 150/300 (50%)");
    assert_eq!(display.renders.lock().unwrap().len(), 1);
    assert!(display.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unlimited_plan_is_normal_at_any_threshold() {
    let transport = ScriptedTransport::new(vec![(200, UNLIMITED)]);
    let settings = UsageSettings {
        warning_threshold: 0.0,
        ..UsageSettings::default()
    };
    let (monitor, display) = monitor(transport, settings);

    let evaluation = monitor.refresh().await;
    let snapshot = evaluation.snapshot.unwrap();

    assert_eq!(snapshot.included_used, 0.0);
    assert_eq!(snapshot.included_total, UNLIMITED_TOTAL);
    assert_eq!(evaluation.rendered.state, DisplayState::Normal);
    assert_eq!(evaluation.rendered.text, "Copilot: unlimited");
    assert!(display.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_overage_recomputed_from_included_counters() {
    let transport = ScriptedTransport::new(vec![(200, OVERAGE)]);
    let settings = UsageSettings {
        budget_dollars: 2.0,
        ..UsageSettings::default()
    };
    let (monitor, display) = monitor(transport, settings);

    let evaluation = monitor.refresh().await;
    let snapshot = evaluation.snapshot.unwrap();

    // 342 used of 300: 42 over, ignoring the upstream overage_count of 7.
    assert_eq!(snapshot.budget_used, 42.0);
    assert_eq!(snapshot.budget_total, 50.0);
    assert_eq!(evaluation.rendered.state, DisplayState::Warning);
    assert!(evaluation.rendered.text.ends_with("+42"));

    let alerts = display.alerts.lock().unwrap();
    assert!(alerts.iter().any(|a| matches!(a, Alert::QuotaExhausted { .. })));
    assert!(!alerts.iter().any(|a| matches!(a, Alert::BudgetExhausted { .. })));
}

#[tokio::test]
async fn test_rejected_token_is_not_retried() {
    let transport = ScriptedTransport::new(vec![(401, "Bad credentials")]);
    let (monitor, _) = monitor(transport.clone(), UsageSettings::default());

    let evaluation = monitor.refresh().await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(evaluation.error.unwrap().kind(), ErrorKind::Auth);
    assert_eq!(evaluation.rendered.state, DisplayState::NoAuth);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_recovers_within_retry_budget() {
    let transport = ScriptedTransport::new(vec![(429, ""), (429, ""), (200, NORMAL)]);
    let (monitor, _) = monitor(transport.clone(), UsageSettings::default());

    let started = tokio::time::Instant::now();
    let evaluation = monitor.refresh().await;

    assert_eq!(transport.calls(), 3);
    assert_eq!(evaluation.rendered.state, DisplayState::Normal);
    // 1s + 2s of backoff between the three attempts.
    assert!(started.elapsed() >= Duration::from_secs(3));
}

// ============================================================================
// Single-flight across consumers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_and_direct_caller_share_one_fetch() {
    let transport = ScriptedTransport::with_latency(vec![(200, NORMAL)], Duration::from_millis(200));
    let client = UsageClient::new(transport.clone());
    let monitor = UsageMonitor::new(
        client.clone(),
        Arc::new(SignedIn),
        Arc::new(Recorder::default()),
        UsageSettings::default(),
    );
    let token = Credential::new("ghu_integration");
    let options = RequestOptions::default();

    let (evaluation, direct) = tokio::join!(monitor.refresh(), client.fetch(&token, &options));

    assert_eq!(transport.calls(), 1);
    let direct = tokio_test::assert_ok!(direct);
    assert!(Arc::ptr_eq(&evaluation.snapshot.unwrap(), &direct));
    assert!(!client.is_fetching());
}

// ============================================================================
// Normalization and state engine
// ============================================================================

#[test]
fn test_budget_dollars_take_precedence_over_requests() {
    let doc: QuotaDocument = serde_json::from_str(NORMAL).unwrap();
    let budget = BudgetConfig {
        budget_dollars: 20.0,
        budget_requests: 100.0,
    };
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

    let snapshot = tokio_test::assert_ok!(normalize(&doc, &budget, now));

    assert_eq!(snapshot.budget_total, 500.0);
    assert_eq!(
        snapshot.billing_period_end,
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_threshold_boundary_on_normalized_snapshot() {
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
    let doc: QuotaDocument = serde_json::from_str(
        r#"{"quota_snapshots":{"premium_interactions":{"entitlement":300,"remaining":15}}}"#,
    )
    .unwrap();
    let snapshot = tokio_test::assert_ok!(normalize(&doc, &BudgetConfig::default(), now));

    let state = |threshold| {
        determine_state(&StateConditions {
            snapshot: Some(&snapshot),
            is_authenticated: true,
            has_subscription: true,
            error: None,
            warning_threshold: threshold,
        })
    };

    assert_eq!(state(95.0), DisplayState::Warning);
    assert_eq!(state(95.001), DisplayState::Normal);
}
