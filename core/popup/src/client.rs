//! Read-only daemon client for the popup.
//!
//! The popup never mutates tracker state; it polls `GET_TIME` and degrades
//! gracefully. A dead daemon or a garbled response both collapse to `None`
//! and the display falls back to stored totals (or zero).

use std::os::unix::net::UnixStream;
use std::time::Duration;

use sitetime_core::config::{self, StorageKind};
use sitetime_core::{SqliteStore, TotalsStore};
use sitetime_daemon_protocol::{framing, Method, Request, Response, TimeReport, PROTOCOL_VERSION};

const READ_TIMEOUT_MS: u64 = 600;
const WRITE_TIMEOUT_MS: u64 = 600;

/// Poll the daemon for the current time report. `None` on any failure.
pub fn get_time() -> Option<TimeReport> {
    let request = Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::GetTime,
        id: None,
        params: None,
    };

    let response = match send_request(request) {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "GET_TIME query failed");
            return None;
        }
    };

    if !response.ok {
        return None;
    }
    response
        .data
        .and_then(|data| serde_json::from_value(data).ok())
}

/// Total seconds for `site_key` read straight from the durable store.
///
/// When the tracker runs on the session-scoped backend there is nothing on
/// disk to consult, so this reports zero rather than failing.
pub fn fallback_total(site_key: &str) -> u64 {
    let tracker_config = config::load_config();
    if tracker_config.storage == StorageKind::Session {
        return 0;
    }

    let total = config::totals_db_path()
        .and_then(SqliteStore::open)
        .and_then(|store| store.total(site_key));
    match total {
        Ok(total) => total,
        Err(err) => {
            tracing::debug!(error = %err, site = site_key, "Failed to read stored total");
            0
        }
    }
}

fn send_request(request: Request) -> Result<Response, String> {
    let socket = config::socket_path().map_err(|err| err.to_string())?;
    let mut stream = UnixStream::connect(&socket)
        .map_err(|err| format!("Failed to connect to daemon socket: {}", err))?;
    let _ = stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)));
    let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));

    framing::write_frame(&mut stream, &request)
        .map_err(|err| format!("Failed to write request: {}", err))?;

    let frame = framing::read_frame(&mut stream)
        .map_err(|err| format!("Failed to read response: {}", err.message))?;
    serde_json::from_slice(&frame).map_err(|err| format!("Failed to parse response JSON: {}", err))
}
