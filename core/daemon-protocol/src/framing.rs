//! Newline-delimited JSON framing shared by the daemon and its clients.
//!
//! Each connection carries exactly one request and one response, each a
//! single JSON object terminated by `\n`. Reads are capped at
//! [`MAX_REQUEST_BYTES`](crate::MAX_REQUEST_BYTES) and honor whatever socket
//! timeout the caller has configured.

use std::io::{Read, Write};

use serde::Serialize;

use crate::{ErrorInfo, MAX_REQUEST_BYTES};

const READ_CHUNK_SIZE: usize = 4096;

/// Writes one JSON value followed by the `\n` frame terminator.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads until the frame terminator (or EOF) and returns the frame bytes.
///
/// A timed-out read surfaces as a `read_timeout` error so callers can degrade
/// instead of blocking indefinitely.
pub fn read_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>, ErrorInfo> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ErrorInfo::new(
                        "request_too_large",
                        "frame exceeded maximum size",
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(ErrorInfo::new("read_timeout", "read timed out"));
            }
            Err(err) => {
                return Err(ErrorInfo::new(
                    "read_error",
                    format!("failed to read frame: {}", err),
                ));
            }
        }
    }

    if buffer.is_empty() {
        return Err(ErrorInfo::new("empty_request", "frame was empty"));
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let frame = match newline_index {
        Some(index) => buffer[..index].to_vec(),
        None => buffer,
    };

    if frame.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_request", "frame was empty"));
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_frame() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &serde_json::json!({"ok": true})).unwrap();
        assert!(buffer.ends_with(b"\n"));

        let mut cursor = Cursor::new(buffer);
        let frame = read_frame(&mut cursor).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn ignores_bytes_after_terminator() {
        let mut cursor = Cursor::new(b"{\"ok\":true}\ntrailing".to_vec());
        let frame = read_frame(&mut cursor).unwrap();
        assert_eq!(frame, b"{\"ok\":true}");
    }

    #[test]
    fn rejects_empty_input() {
        let mut cursor = Cursor::new(Vec::new());
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.code, "empty_request");
    }

    #[test]
    fn rejects_whitespace_only_frame() {
        let mut cursor = Cursor::new(b"   \n".to_vec());
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.code, "empty_request");
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut cursor = Cursor::new(vec![b'x'; MAX_REQUEST_BYTES + 1]);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.code, "request_too_large");
    }
}
