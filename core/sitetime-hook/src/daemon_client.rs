//! Client helper for sending tab events to the sitetime daemon.
//!
//! The daemon is the only writer. Failures are surfaced to the caller; one
//! retry reuses the same event id so the daemon can deduplicate if the
//! first response was lost.

use std::env;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use chrono::Utc;
use rand::RngCore;

use sitetime_core::config;
use sitetime_daemon_protocol::{
    framing, Method, Request, Response, TabEventEnvelope, TabEventType, PROTOCOL_VERSION,
};

const ENABLE_ENV: &str = "SITETIME_DAEMON_ENABLED";
const READ_TIMEOUT_MS: u64 = 600;
const WRITE_TIMEOUT_MS: u64 = 600;
const RETRY_DELAY_MS: u64 = 50;

pub fn send_tab_event(
    event_type: TabEventType,
    url: Option<String>,
    tab_id: Option<u32>,
) -> Result<(), String> {
    if !daemon_enabled() {
        return Err("Daemon disabled".to_string());
    }

    let event_id = make_event_id();
    let recorded_at = Utc::now().to_rfc3339();
    let build_envelope = || TabEventEnvelope {
        event_id: event_id.clone(),
        recorded_at: recorded_at.clone(),
        event_type,
        url: url.clone(),
        tab_id,
    };

    send_event_with_retry(build_envelope)
}

pub fn daemon_enabled() -> bool {
    match env::var(ENABLE_ENV) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"),
        Err(_) => true,
    }
}

fn send_event(event: TabEventEnvelope) -> Result<(), String> {
    let request = Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::TabEvent,
        id: Some(event.event_id.clone()),
        params: Some(
            serde_json::to_value(event)
                .map_err(|err| format!("Failed to serialize event: {}", err))?,
        ),
    };

    let response = send_request(request)?;
    if response.ok {
        Ok(())
    } else {
        let message = response
            .error
            .map(|err| format!("{}: {}", err.code, err.message))
            .unwrap_or_else(|| "Unknown daemon error".to_string());
        Err(message)
    }
}

fn send_event_with_retry<F>(mut build: F) -> Result<(), String>
where
    F: FnMut() -> TabEventEnvelope,
{
    match send_event(build()) {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to send tab event to daemon");
            std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
            send_event(build()).map_err(|retry_err| {
                tracing::warn!(error = %retry_err, "Retry failed sending tab event to daemon");
                retry_err
            })
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

fn make_event_id() -> String {
    let mut random = rand::thread_rng();
    let rand = random.next_u64();
    format!(
        "evt-{}-{}-{:x}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        rand
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};
    use std::time::Instant;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    struct EnvGuard {
        key: &'static str,
        prior: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prior = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, prior }
        }

        fn unset(key: &'static str) -> Self {
            let prior = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, prior }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.prior {
                std::env::set_var(self.key, value);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    fn read_request(stream: &mut UnixStream) -> Option<Request> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if buffer.contains(&b'\n') {
                        break;
                    }
                }
                Err(_) => return None,
            }
        }

        let newline_index = buffer.iter().position(|b| *b == b'\n');
        let request_bytes = match newline_index {
            Some(index) => &buffer[..index],
            None => buffer.as_slice(),
        };
        serde_json::from_slice(request_bytes).ok()
    }

    fn temp_socket(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sitetime-hook-{}-{}",
            label,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or(Duration::from_millis(0))
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("daemon.sock")
    }

    #[test]
    fn send_event_retries_after_daemon_error() {
        let _guard = env_lock();

        let socket_path = temp_socket("retry");
        let listener = std::os::unix::net::UnixListener::bind(&socket_path).unwrap();
        listener.set_nonblocking(true).unwrap();

        let attempt_count = Arc::new(AtomicUsize::new(0));
        let attempt_count_clone = attempt_count.clone();

        let server = std::thread::spawn(move || {
            let start = Instant::now();
            let mut handled = 0;
            while handled < 2 && start.elapsed() < Duration::from_secs(5) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        handled += 1;
                        attempt_count_clone.fetch_add(1, Ordering::SeqCst);
                        let _ = read_request(&mut stream);
                        let response = if handled == 1 {
                            Response::error(None, "test_error", "simulated")
                        } else {
                            Response::ok(None, serde_json::json!({"accepted": true}))
                        };
                        let _ = framing::write_frame(&mut stream, &response);
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        let _socket_guard = EnvGuard::set(config::SOCKET_ENV, socket_path.to_str().unwrap());
        let _enabled_guard = EnvGuard::set(ENABLE_ENV, "1");

        let result = send_tab_event(
            TabEventType::Activated,
            Some("https://www.facebook.com/feed".to_string()),
            Some(3),
        );

        assert!(result.is_ok());
        server.join().unwrap();
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn retry_reuses_same_event_id_after_lost_response() {
        let _guard = env_lock();

        let socket_path = temp_socket("lost");
        let listener = std::os::unix::net::UnixListener::bind(&socket_path).unwrap();
        listener.set_nonblocking(true).unwrap();

        let attempt_ids: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let attempt_ids_clone = Arc::clone(&attempt_ids);

        let server = std::thread::spawn(move || {
            let start = Instant::now();
            let mut handled = 0;
            while handled < 2 && start.elapsed() < Duration::from_secs(5) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        handled += 1;
                        let request_id = read_request(&mut stream).and_then(|request| request.id);
                        attempt_ids_clone.lock().unwrap().push(request_id);

                        if handled == 2 {
                            let response =
                                Response::ok(None, serde_json::json!({"accepted": true}));
                            let _ = framing::write_frame(&mut stream, &response);
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        let _socket_guard = EnvGuard::set(config::SOCKET_ENV, socket_path.to_str().unwrap());
        let _enabled_guard = EnvGuard::set(ENABLE_ENV, "1");

        let result = send_tab_event(TabEventType::Suspend, None, None);

        assert!(result.is_ok());
        server.join().unwrap();

        let ids = attempt_ids.lock().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1], "retry must reuse the same event id");
    }

    #[test]
    fn daemon_enabled_defaults_to_true_when_env_missing() {
        let _guard = env_lock();
        let _unset = EnvGuard::unset(ENABLE_ENV);
        assert!(daemon_enabled());
    }

    #[test]
    fn daemon_enabled_is_false_when_env_zero() {
        let _guard = env_lock();
        let _set = EnvGuard::set(ENABLE_ENV, "0");
        assert!(!daemon_enabled());
    }

    #[test]
    fn disabled_daemon_short_circuits_send() {
        let _guard = env_lock();
        let _set = EnvGuard::set(ENABLE_ENV, "0");
        let result = send_tab_event(TabEventType::Removed, None, None);
        assert!(result.is_err());
    }
}
