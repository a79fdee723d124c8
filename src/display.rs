//! Terminal display surface
//!
//! Status lines go to stdout, alerts to stderr.

use chrono::Local;
use quotabar_core::{Alert, DisplayState, DisplaySurface, Rendered};

/// Prints each new state as a timestamped line.
#[derive(Debug, Clone, Default)]
pub struct TerminalDisplay {
    verbose: bool,
}

impl TerminalDisplay {
    /// Also print the tooltip under each status line.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl DisplaySurface for TerminalDisplay {
    fn render(&self, rendered: &Rendered) {
        println!("{}", status_line(rendered, &Local::now().format("%H:%M:%S").to_string()));
        if self.verbose || rendered.state == DisplayState::Error {
            for line in rendered.tooltip.lines() {
                println!("    {}", line);
            }
        }
    }

    fn notify(&self, alert: &Alert) {
        eprintln!("!! {}", alert.message());
    }
}

fn status_line(rendered: &Rendered, time: &str) -> String {
    format!("[{}] {}", time, rendered.text)
}
