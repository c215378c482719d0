//! Pure display logic: which number to show for each mode, goal fractions,
//! and the HH:MM:SS / progress-bar formatting.

use sitetime_daemon_protocol::TimeReport;

use sitetime_core::config::GOALS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DisplayMode {
    /// Seconds in the current contiguous session.
    Session,
    /// Cumulative seconds across all sessions.
    Total,
}

impl DisplayMode {
    pub fn goal_seconds(self) -> u64 {
        match self {
            DisplayMode::Session => GOALS.session,
            DisplayMode::Total => GOALS.total,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Session => "Current Session",
            DisplayMode::Total => "Total Session",
        }
    }
}

/// Session seconds to display for the site the popup is looking at.
///
/// If the daemon is now timing a *different* site (the user switched tabs
/// after the popup opened), stale session data must not leak through: show
/// zero.
pub fn session_seconds(report: Option<&TimeReport>, site_key: &str) -> u64 {
    match report {
        Some(report) if report.current_website.as_deref() == Some(site_key) => report.session_time,
        _ => 0,
    }
}

/// Total seconds to display, when the live query covers the observed site.
/// `None` means the caller should fall back to reading the durable store.
pub fn total_seconds(report: Option<&TimeReport>, site_key: &str) -> Option<u64> {
    match report {
        Some(report) if report.current_website.as_deref() == Some(site_key) => {
            Some(report.total_time)
        }
        _ => None,
    }
}

/// Fraction of the goal reached, clamped to 1.0.
pub fn goal_fraction(value: u64, goal_seconds: u64) -> f64 {
    if goal_seconds == 0 {
        return 1.0;
    }
    (value as f64 / goal_seconds as f64).min(1.0)
}

pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = (fraction * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
