//! sitetime-hook: CLI bridge for host tab-lifecycle events.
//!
//! The browser-side host invokes this binary on tab callbacks; each
//! invocation forwards one event to the daemon. Delivery is non-critical:
//! failures are logged and the process still exits 0 so the host is never
//! disrupted.
//!
//! ## Subcommands
//!
//! - `activated <URL>`: a tab gained focus
//! - `updated <URL>`: the focused tab finished navigating
//! - `removed`: the focused tab was closed
//! - `suspend`: the host is about to suspend the tracker

use clap::{Parser, Subcommand};

use sitetime_daemon_protocol::TabEventType;

mod daemon_client;
mod logging;

#[derive(Parser)]
#[command(name = "sitetime-hook")]
#[command(about = "sitetime tab-event bridge")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// A tab gained focus
    Activated {
        /// URL of the newly focused tab
        #[arg(value_name = "URL")]
        url: String,

        /// Host tab identifier
        #[arg(long)]
        tab_id: Option<u32>,
    },

    /// The focused tab finished navigating to a new URL
    Updated {
        /// URL the tab navigated to
        #[arg(value_name = "URL")]
        url: String,

        /// Host tab identifier
        #[arg(long)]
        tab_id: Option<u32>,
    },

    /// The focused tab was closed
    Removed {
        /// Host tab identifier
        #[arg(long)]
        tab_id: Option<u32>,
    },

    /// Flush the live session before the host suspends the tracker
    Suspend,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Activated { url, tab_id } => {
            daemon_client::send_tab_event(TabEventType::Activated, Some(url), tab_id)
        }
        Commands::Updated { url, tab_id } => {
            daemon_client::send_tab_event(TabEventType::Updated, Some(url), tab_id)
        }
        Commands::Removed { tab_id } => {
            daemon_client::send_tab_event(TabEventType::Removed, None, tab_id)
        }
        Commands::Suspend => daemon_client::send_tab_event(TabEventType::Suspend, None, None),
    };

    // Event delivery is non-critical; log and exit 0 so the host carries on.
    if let Err(err) = result {
        tracing::warn!(error = %err, "sitetime-hook failed to deliver event");
    }
}
