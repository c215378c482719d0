//! sitetime daemon entrypoint.
//!
//! A small, single-writer service that owns the tracking state machine: a
//! socket listener, strict request validation, a periodic flush ticker, and
//! a signal handler that banks the live session before exit. Clients (the
//! tab-event hook and the popup) talk to it over newline-delimited JSON on
//! a unix socket.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use sitetime_core::config::{self, StorageKind, TrackerConfig};
use sitetime_core::store::TotalsStore;
use sitetime_core::{MemoryStore, SqliteStore};
use sitetime_daemon_protocol::{
    framing, parse_tab_event, Method, Request, Response, PROTOCOL_VERSION,
};

use std::os::unix::net::{UnixListener, UnixStream};

mod state;

use state::SharedState;

const READ_TIMEOUT_SECS: u64 = 2;

fn main() {
    init_logging();

    let socket_path = match config::socket_path() {
        Ok(path) => path,
        Err(err) => {
            error!(error = %err, "Failed to resolve daemon socket path");
            std::process::exit(1);
        }
    };

    if let Err(err) = prepare_socket_dir(&socket_path) {
        error!(error = %err, "Failed to prepare daemon socket directory");
        std::process::exit(1);
    }

    if let Err(err) = remove_existing_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to remove existing socket");
        std::process::exit(1);
    }

    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    let daemon_config = config::load_config();
    let store = match open_store(&daemon_config) {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "Failed to open totals store");
            std::process::exit(1);
        }
    };

    info!(
        path = %socket_path.display(),
        storage = ?daemon_config.storage,
        flush_interval_secs = daemon_config.flush_interval_secs,
        "sitetime daemon started"
    );

    let shared_state = Arc::new(SharedState::new(store));
    spawn_flush_ticker(Arc::clone(&shared_state), daemon_config.flush_interval_secs);
    spawn_signal_handler(Arc::clone(&shared_state), socket_path.clone());

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&shared_state);
                thread::spawn(|| handle_connection(stream, state));
            }
            Err(err) => {
                warn!(error = %err, "Failed to accept daemon connection");
            }
        }
    }
}

fn open_store(config: &TrackerConfig) -> sitetime_core::Result<Box<dyn TotalsStore + Send>> {
    match config.storage {
        StorageKind::Durable => {
            let path = config::totals_db_path()?;
            Ok(Box::new(SqliteStore::open(path)?))
        }
        StorageKind::Session => Ok(Box::new(MemoryStore::new())),
    }
}

/// A hard kill loses at most one flush interval of the running total.
fn spawn_flush_ticker(state: Arc<SharedState>, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs.max(1));
    thread::spawn(move || loop {
        thread::sleep(interval);
        state.flush();
    });
}

/// Banks the live session on SIGTERM/SIGINT/SIGHUP. Best-effort: durability
/// comes from per-transition persistence and the flush ticker, not from
/// graceful shutdown.
fn spawn_signal_handler(state: Arc<SharedState>, socket_path: std::path::PathBuf) {
    let mut signals = match Signals::new([SIGTERM, SIGINT, SIGHUP]) {
        Ok(signals) => signals,
        Err(err) => {
            warn!(error = %err, "Failed to register signal handler");
            return;
        }
    };

    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "Termination signal received; flushing session");
            state.suspend();
            let _ = fs_err::remove_file(&socket_path);
            std::process::exit(0);
        }
    });
}

fn init_logging() {
    let debug_enabled = std::env::var("SITETIME_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn prepare_socket_dir(socket_path: &Path) -> std::io::Result<()> {
    let parent = socket_path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "socket path has no parent")
    })?;
    fs_err::create_dir_all(parent)
}

fn remove_existing_socket(socket_path: &Path) -> std::io::Result<()> {
    if socket_path.exists() {
        fs_err::remove_file(socket_path)?;
    }
    Ok(())
}

fn handle_connection(mut stream: UnixStream, state: Arc<SharedState>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(READ_TIMEOUT_SECS)));

    let request: Request = match framing::read_frame(&mut stream) {
        Ok(frame) => match serde_json::from_slice(&frame) {
            Ok(request) => request,
            Err(err) => {
                let response = Response::error(
                    None,
                    "invalid_json",
                    format!("request was not valid JSON: {}", err),
                );
                let _ = framing::write_frame(&mut stream, &response);
                return;
            }
        },
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Failed to read request");
            let response = Response::error_with_info(None, err);
            let _ = framing::write_frame(&mut stream, &response);
            return;
        }
    };

    debug!(method = ?request.method, id = ?request.id, "Daemon request received");
    let response = handle_request(request, state);
    let _ = framing::write_frame(&mut stream, &response);
}

fn handle_request(request: Request, state: Arc<SharedState>) -> Response {
    if request.protocol_version != PROTOCOL_VERSION {
        return Response::error(
            request.id,
            "protocol_mismatch",
            "unsupported protocol version",
        );
    }

    match request.method {
        Method::GetHealth => {
            let data = serde_json::json!({
                "status": "ok",
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
                "protocol_version": PROTOCOL_VERSION,
            });
            Response::ok(request.id, data)
        }
        Method::GetTime => {
            let report = state.time_report();
            debug!(
                site = ?report.current_website,
                session_time = report.session_time,
                total_time = report.total_time,
                "Time report"
            );
            match serde_json::to_value(report) {
                Ok(value) => Response::ok(request.id, value),
                Err(err) => Response::error(
                    request.id,
                    "serialization_error",
                    format!("Failed to serialize time report: {}", err),
                ),
            }
        }
        Method::TabEvent => handle_tab_event(request, state),
    }
}

fn handle_tab_event(request: Request, state: Arc<SharedState>) -> Response {
    let params = match request.params {
        Some(params) => params,
        None => return Response::error(request.id, "invalid_params", "event payload is required"),
    };

    let event = match parse_tab_event(params) {
        Ok(event) => event,
        Err(err) => return Response::error_with_info(request.id, err),
    };

    info!(
        event_type = ?event.event_type,
        url = ?event.url,
        tab_id = ?event.tab_id,
        "Received tab event"
    );

    state.apply_tab_event(&event);

    Response::ok(request.id, serde_json::json!({"accepted": true}))
}
