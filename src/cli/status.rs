//! CLI command: `quotabar status`
//!
//! Fetches usage once and prints the evaluated state.

use std::sync::Arc;

use quotabar_core::Evaluation;

use crate::config::AppConfig;
use crate::display::TerminalDisplay;

/// Run the status subcommand.
pub async fn run(app: &AppConfig, json: bool) -> anyhow::Result<()> {
    let monitor = super::build_monitor(app, Arc::new(TerminalDisplay::default()));
    let evaluation = monitor.evaluate().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&evaluation))?);
    } else {
        println!();
        println!("  {}", evaluation.rendered.text);
        println!("  {}", "-".repeat(48));
        for line in evaluation.rendered.tooltip.lines() {
            println!("  {}", line);
        }
        println!();
    }
    Ok(())
}

/// JSON output for scripting.
fn to_json(evaluation: &Evaluation) -> serde_json::Value {
    serde_json::json!({
        "state": evaluation.rendered.state,
        "text": evaluation.rendered.text,
        "tooltip": evaluation.rendered.tooltip,
        "usage": evaluation.snapshot.as_deref().map(|s| serde_json::json!({
            "included_used": s.included_used,
            "included_total": if s.is_unlimited() { None } else { Some(s.included_total) },
            "unlimited": s.is_unlimited(),
            "budget_used": s.budget_used,
            "budget_total": s.budget_total,
            "last_refresh_time": s.last_refresh_time.to_rfc3339(),
            "billing_period_end": s.billing_period_end.to_rfc3339(),
        })),
        "error": evaluation.error.as_ref().map(|e| serde_json::json!({
            "kind": e.kind(),
            "status": e.status(),
            "retryable": e.is_retryable(),
            "message": e.message(),
        })),
    })
}
