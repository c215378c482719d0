//! IPC protocol types and validation for sitetime-daemon.
//!
//! This crate is shared by the daemon and its clients to prevent schema drift.
//! The daemon remains the authority on validation, but clients can reuse the
//! same types to construct valid requests.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod framing;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    GetTime,
    TabEvent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

/// Payload of a successful `GET_TIME` response.
///
/// `session_time` is seconds elapsed in the current session; `total_time`
/// adds the site's banked seconds from prior sessions. When the daemon is
/// idle all counters are zero and `current_website` is null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeReport {
    pub total_time: u64,
    pub current_website: Option<String>,
    pub session_time: u64,
}

impl TimeReport {
    pub fn idle() -> Self {
        Self {
            total_time: 0,
            current_website: None,
            session_time: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum TabEventType {
    /// A tab gained focus.
    Activated,
    /// The focused tab finished navigating to a new URL.
    Updated,
    /// The focused tab was closed.
    Removed,
    /// The host is suspending the tracker; flush and go idle.
    Suspend,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TabEventEnvelope {
    pub event_id: String,
    pub recorded_at: String,
    pub event_type: TabEventType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tab_id: Option<u32>,
}

impl TabEventEnvelope {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if self.event_id.trim().is_empty() {
            return Err(ErrorInfo::new("invalid_event_id", "event_id is required"));
        }
        if self.event_id.len() > 128 {
            return Err(ErrorInfo::new(
                "invalid_event_id",
                "event_id must be 128 characters or fewer",
            ));
        }

        if DateTime::parse_from_rfc3339(&self.recorded_at).is_err() {
            return Err(ErrorInfo::new(
                "invalid_timestamp",
                "recorded_at must be RFC3339",
            ));
        }

        match self.event_type {
            TabEventType::Activated | TabEventType::Updated => {
                require_string(&self.url, "url")?;
            }
            TabEventType::Removed | TabEventType::Suspend => {}
        }

        Ok(())
    }
}

pub fn parse_tab_event(params: Value) -> Result<TabEventEnvelope, ErrorInfo> {
    let envelope: TabEventEnvelope = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("tab event payload is invalid JSON: {}", err),
        )
    })?;
    envelope.validate()?;
    Ok(envelope)
}

fn require_string(value: &Option<String>, field: &str) -> Result<(), ErrorInfo> {
    if let Some(candidate) = value {
        if !candidate.trim().is_empty() {
            return Ok(());
        }
    }
    Err(ErrorInfo::new(
        "missing_field",
        format!("{} is required", field),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_event(event_type: TabEventType) -> TabEventEnvelope {
        TabEventEnvelope {
            event_id: "evt-1".to_string(),
            recorded_at: "2026-01-30T12:00:00Z".to_string(),
            event_type,
            url: Some("https://www.facebook.com/feed".to_string()),
            tab_id: Some(7),
        }
    }

    #[test]
    fn validates_activated_event() {
        let event = base_event(TabEventType::Activated);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn rejects_activated_without_url() {
        let mut event = base_event(TabEventType::Activated);
        event.url = None;
        assert!(event.validate().is_err());
    }

    #[test]
    fn rejects_updated_with_blank_url() {
        let mut event = base_event(TabEventType::Updated);
        event.url = Some("   ".to_string());
        assert!(event.validate().is_err());
    }

    #[test]
    fn removed_needs_no_url() {
        let mut event = base_event(TabEventType::Removed);
        event.url = None;
        assert!(event.validate().is_ok());
    }

    #[test]
    fn suspend_needs_no_url() {
        let mut event = base_event(TabEventType::Suspend);
        event.url = None;
        event.tab_id = None;
        assert!(event.validate().is_ok());
    }

    #[test]
    fn rejects_bad_timestamp() {
        let mut event = base_event(TabEventType::Removed);
        event.recorded_at = "not-a-time".to_string();
        assert!(event.validate().is_err());
    }

    #[test]
    fn rejects_long_event_id() {
        let mut event = base_event(TabEventType::Removed);
        event.event_id = "a".repeat(256);
        assert!(event.validate().is_err());
    }

    #[test]
    fn method_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&Method::GetTime).unwrap(),
            "\"GET_TIME\""
        );
        assert_eq!(
            serde_json::to_string(&Method::TabEvent).unwrap(),
            "\"TAB_EVENT\""
        );
    }

    #[test]
    fn time_report_uses_camel_case_fields() {
        let report = TimeReport {
            total_time: 120,
            current_website: Some("facebook.com".to_string()),
            session_time: 20,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["totalTime"], 120);
        assert_eq!(value["currentWebsite"], "facebook.com");
        assert_eq!(value["sessionTime"], 20);
    }

    #[test]
    fn idle_report_has_null_website() {
        let value = serde_json::to_value(TimeReport::idle()).unwrap();
        assert!(value["currentWebsite"].is_null());
        assert_eq!(value["totalTime"], 0);
        assert_eq!(value["sessionTime"], 0);
    }
}
