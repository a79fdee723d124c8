//! CLI command: `quotabar watch`
//!
//! Refreshes on the configured interval until Ctrl-C. Each line read from
//! stdin triggers an immediate refresh.

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::display::TerminalDisplay;

/// Run the watch subcommand.
pub async fn run(app: &AppConfig, verbose: bool) -> anyhow::Result<()> {
    let monitor = super::build_monitor(app, Arc::new(TerminalDisplay::default().verbose(verbose)));
    let shutdown = CancellationToken::new();
    let (manual_tx, manual_rx) = mpsc::channel(1);

    spawn_line_forwarder(std::io::BufReader::new(std::io::stdin()), manual_tx);
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, stopping"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
            }
            shutdown.cancel();
        }
    });

    eprintln!(
        "Watching premium request usage every {}s. Press Enter to refresh, Ctrl+C to quit.",
        monitor.settings().refresh_interval
    );
    monitor.run(shutdown, manual_rx).await;
    Ok(())
}

/// Send one trigger per input line from a detached OS thread.
///
/// Blocking reads cannot be cancelled, so the thread is never joined and
/// does not hold up runtime shutdown. A full channel means a refresh is
/// already queued, so extra presses are dropped.
fn spawn_line_forwarder<R>(reader: R, tx: mpsc::Sender<()>)
where
    R: BufRead + Send + 'static,
{
    let spawned = std::thread::Builder::new()
        .name("quotabar-stdin".to_string())
        .spawn(move || {
            for line in reader.lines() {
                if let Err(e) = line {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
                if let Err(TrySendError::Closed(())) = tx.try_send(()) {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Failed to start stdin reader, manual refresh disabled");
    }
}
