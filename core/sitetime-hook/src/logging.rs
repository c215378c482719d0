//! File-based logging for the hook binary.
//!
//! The host owns stdout/stderr when it invokes the hook, so logs go to a
//! daily-rolled file under `~/.sitetime/logs/`. Returns a guard that must
//! stay alive for the duration of main so buffered lines are flushed.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use sitetime_core::config;

pub fn init() -> Option<WorkerGuard> {
    let log_dir = match config::sitetime_dir() {
        Ok(dir) => dir.join("logs"),
        Err(_) => return None,
    };
    if fs_err::create_dir_all(&log_dir).is_err() {
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, "sitetime-hook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    // try_init fails only if a subscriber is already set (e.g. in tests).
    result.ok().map(|_| guard)
}
