//! sitetime-popup: terminal viewer for the tracker daemon.
//!
//! Classifies a URL the same way the daemon does, then polls `GET_TIME`
//! once per second and renders elapsed time against the mode's goal.
//!
//! ## Subcommands
//!
//! - `watch <URL>`: live 1 Hz display, stops on ctrl-c
//! - `status <URL>`: single snapshot, then exit

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sitetime_core::{classify, friendly_site_name, Classification};

mod client;
mod render;

use render::DisplayMode;

#[derive(Parser)]
#[command(name = "sitetime-popup")]
#[command(about = "sitetime viewer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the daemon every second and render a live display
    Watch {
        /// URL of the page being viewed
        #[arg(value_name = "URL")]
        url: String,

        /// Which counter to display
        #[arg(long, value_enum, default_value = "total")]
        mode: DisplayMode,
    },

    /// Print one snapshot and exit
    Status {
        /// URL of the page being viewed
        #[arg(value_name = "URL")]
        url: String,

        /// Which counter to display
        #[arg(long, value_enum, default_value = "total")]
        mode: DisplayMode,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { url, mode } => run(&url, mode, true),
        Commands::Status { url, mode } => run(&url, mode, false),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(url: &str, mode: DisplayMode, watch: bool) {
    if url.trim().is_empty() {
        // A missing URL is a display state, not a crash.
        println!("Unable to load time data");
        return;
    }

    let classification = classify(url);
    print_header(url, &classification);

    if watch {
        watch_loop(&classification, mode);
    } else {
        let line = status_line(&classification, mode);
        println!("{}", line);
    }
}

fn print_header(url: &str, classification: &Classification) {
    let status = if classification.is_tracked {
        "Social Media Site"
    } else {
        "Regular Website"
    };
    println!("{}", friendly_site_name(url));
    println!("{}", status);
    println!();
}

fn watch_loop(classification: &Classification, mode: DisplayMode) {
    let running = Arc::new(AtomicBool::new(true));
    let running_flag = Arc::clone(&running);
    let ctrlc_result = ctrlc::set_handler(move || {
        running_flag.store(false, Ordering::SeqCst);
    });
    if let Err(err) = ctrlc_result {
        tracing::warn!(error = %err, "Failed to install ctrl-c handler");
    }

    let mut stdout = std::io::stdout();
    while running.load(Ordering::SeqCst) {
        let line = status_line(classification, mode);
        let _ = write!(stdout, "\r\x1b[2K{}", line);
        let _ = stdout.flush();
        std::thread::sleep(Duration::from_secs(1));
    }
    println!();
}

fn status_line(classification: &Classification, mode: DisplayMode) -> String {
    let report = client::get_time();
    let seconds = match mode {
        DisplayMode::Session => render::session_seconds(report.as_ref(), &classification.site_key),
        DisplayMode::Total => render::total_seconds(report.as_ref(), &classification.site_key)
            .unwrap_or_else(|| client::fallback_total(&classification.site_key)),
    };

    let fraction = render::goal_fraction(seconds, mode.goal_seconds());
    format!(
        "{}: {} {} {:3.0}%",
        mode.label(),
        render::format_hms(seconds),
        render::progress_bar(fraction, 20),
        fraction * 100.0
    )
}
