//! CLI module for quotabar
//!
//! Provides commands:
//! - `status`: Fetch once and print the current state
//! - `watch`: Refresh on an interval until interrupted
//! - `config`: Show the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use quotabar_client::{HttpTransport, UsageClient};
use quotabar_core::{DisplaySurface, UsageMonitor};

use crate::auth::ChainAuthProvider;
use crate::config::AppConfig;

pub mod config;
pub mod status;
pub mod watch;

/// Premium request usage monitor
#[derive(Parser, Debug)]
#[command(name = "quotabar")]
#[command(about = "Premium request usage monitor")]
#[command(version)]
pub struct Cli {
    /// Additional configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch usage once and print it
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep refreshing until interrupted (press Enter to refresh now)
    Watch {
        /// Print details under every status line
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show the effective configuration
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let app = crate::loader::load_config(cli.config.as_deref())?;

    match command {
        Commands::Status { json } => status::run(&app, json).await,
        Commands::Watch { verbose } => watch::run(&app, verbose).await,
        Commands::Config => config::run(&app),
    }
}

/// Wire the monitor from configuration.
pub(crate) fn build_monitor(app: &AppConfig, display: Arc<dyn DisplaySurface>) -> UsageMonitor {
    let mut transport = HttpTransport::new(app.endpoint.url.clone());
    if let Some(user_agent) = &app.endpoint.user_agent {
        transport = transport.with_user_agent(user_agent.clone());
    }

    UsageMonitor::new(
        UsageClient::new(Arc::new(transport)),
        Arc::new(ChainAuthProvider::from_config(&app.auth)),
        display,
        app.usage,
    )
    .with_request_options(app.endpoint.request_options())
}
