//! Configuration loading and shared paths.
//!
//! Runtime configuration lives at `~/.sitetime/config.json` and selects the
//! persistence backend plus the flush interval. Display constants
//! (goals, friendly names) are fixed product copy, not configuration.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SitetimeError};

pub const SOCKET_ENV: &str = "SITETIME_DAEMON_SOCKET";
const SOCKET_NAME: &str = "daemon.sock";

/// Goal thresholds for the popup progress bar, in seconds.
pub struct Goals {
    /// 30 minutes per session.
    pub session: u64,
    /// 2 hours cumulative.
    pub total: u64,
}

pub const GOALS: Goals = Goals {
    session: 1800,
    total: 7200,
};

static FRIENDLY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("facebook.com", "Facebook"),
        ("x.com", "X (formerly known as Twitter) - \"the everything app\""),
        ("twitter.com", "X (Twitter)"), // Keep for backward compatibility
        ("instagram.com", "Instagram"),
        ("linkedin.com", "LinkedIn"),
        ("youtube.com", "YouTube"),
        ("tiktok.com", "TikTok"),
        ("reddit.com", "Reddit"),
        ("snapchat.com", "Snapchat"),
        ("pinterest.com", "Pinterest"),
        ("whatsapp.com", "WhatsApp"),
        ("telegram.org", "Telegram"),
        ("discord.com", "Discord"),
    ])
});

pub fn friendly_name(domain: &str) -> Option<&'static str> {
    FRIENDLY_NAMES.get(domain).copied()
}

/// Which persistence backend the daemon uses for totals and the resume
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// SQLite file under `~/.sitetime/daemon/`; survives daemon restarts.
    #[default]
    Durable,
    /// In-process map; totals last only for the daemon's lifetime.
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub storage: StorageKind,
    pub flush_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Durable,
            flush_interval_secs: 10,
        }
    }
}

/// Returns the sitetime data directory (~/.sitetime).
pub fn sitetime_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".sitetime"))
        .ok_or(SitetimeError::HomeDirNotFound)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(sitetime_dir()?.join("config.json"))
}

pub fn totals_db_path() -> Result<PathBuf> {
    Ok(sitetime_dir()?.join("daemon").join("totals.db"))
}

/// Resolves the daemon socket path, honoring the env override used by tests
/// and alternate hosts.
pub fn socket_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(SOCKET_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(sitetime_dir()?.join(SOCKET_NAME))
}

/// Loads the tracker configuration, returning defaults if the file is
/// missing or malformed. Config problems must never keep the daemon down.
pub fn load_config() -> TrackerConfig {
    config_path()
        .ok()
        .and_then(|path| fs_err::read_to_string(&path).ok())
        .and_then(|contents| match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!(error = %err, "Malformed config; using defaults");
                None
            }
        })
        .unwrap_or_default()
}

/// Saves the tracker configuration to disk.
pub fn save_config(config: &TrackerConfig) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(SitetimeError::io("create config directory"))?;
    }
    let contents = serde_json::to_string_pretty(config).map_err(|source| SitetimeError::Json {
        context: "serialize config".to_string(),
        source,
    })?;
    fs_err::write(&path, contents)
        .map_err(|source| SitetimeError::ConfigWriteFailed { path, source })
}
