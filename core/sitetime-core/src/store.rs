//! Persistence backends for site totals and the resume snapshot.
//!
//! The schema is intentionally small: a `site_totals` map and a single-row
//! `tracking_snapshot` so the daemon can resume a session after being torn
//! down mid-flight. Two backends sit behind one trait: SQLite for the
//! durable configuration and an in-process map for the session-scoped one.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, SitetimeError};

/// Durable snapshot of the in-flight session, written whenever tracking
/// starts and cleared whenever it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub site_key: String,
    pub started_at: DateTime<Utc>,
}

/// Key-value persistence for cumulative site totals plus the resume snapshot.
///
/// The daemon is the only writer; the popup may open a second read-only
/// handle on the durable backend as its fallback path.
pub trait TotalsStore {
    /// Cumulative seconds banked for a site; zero when never seen.
    fn total(&self, site_key: &str) -> Result<u64>;

    fn set_total(&mut self, site_key: &str, seconds: u64) -> Result<()>;

    fn load_snapshot(&self) -> Result<Option<Snapshot>>;

    /// `None` clears the snapshot (tracking stopped).
    fn save_snapshot(&mut self, snapshot: Option<&Snapshot>) -> Result<()>;
}

pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).map_err(SitetimeError::io("create store directory"))?;
        }
        let store = Self { path };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS site_totals (\
                    site_key TEXT PRIMARY KEY,\
                    seconds INTEGER NOT NULL\
                 );\
                 CREATE TABLE IF NOT EXISTS tracking_snapshot (\
                    id INTEGER PRIMARY KEY CHECK (id = 1),\
                    site_key TEXT NOT NULL,\
                    started_at TEXT NOT NULL\
                 );",
            )
            .map_err(SitetimeError::db("initialize schema"))
        })
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = Connection::open(&self.path).map_err(SitetimeError::db("open database"))?;
        f(&conn)
    }
}

impl TotalsStore for SqliteStore {
    fn total(&self, site_key: &str) -> Result<u64> {
        self.with_connection(|conn| {
            let seconds: Option<i64> = conn
                .query_row(
                    "SELECT seconds FROM site_totals WHERE site_key = ?1",
                    params![site_key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(SitetimeError::db("query site total"))?;
            Ok(seconds.unwrap_or(0).max(0) as u64)
        })
    }

    fn set_total(&mut self, site_key: &str, seconds: u64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO site_totals (site_key, seconds) VALUES (?1, ?2) \
                 ON CONFLICT(site_key) DO UPDATE SET seconds = excluded.seconds",
                params![site_key, seconds as i64],
            )
            .map_err(SitetimeError::db("upsert site total"))?;
            Ok(())
        })
    }

    fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        self.with_connection(|conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT site_key, started_at FROM tracking_snapshot WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(SitetimeError::db("query tracking snapshot"))?;

            match row {
                Some((site_key, started_at)) => {
                    let started_at = parse_rfc3339(&started_at)
                        .ok_or_else(|| SitetimeError::MalformedSnapshot(started_at.clone()))?;
                    Ok(Some(Snapshot {
                        site_key,
                        started_at,
                    }))
                }
                None => Ok(None),
            }
        })
    }

    fn save_snapshot(&mut self, snapshot: Option<&Snapshot>) -> Result<()> {
        self.with_connection(|conn| {
            match snapshot {
                Some(snapshot) => {
                    conn.execute(
                        "INSERT INTO tracking_snapshot (id, site_key, started_at) \
                         VALUES (1, ?1, ?2) \
                         ON CONFLICT(id) DO UPDATE SET \
                            site_key = excluded.site_key, \
                            started_at = excluded.started_at",
                        params![snapshot.site_key, snapshot.started_at.to_rfc3339()],
                    )
                    .map_err(SitetimeError::db("upsert tracking snapshot"))?;
                }
                None => {
                    conn.execute("DELETE FROM tracking_snapshot", [])
                        .map_err(SitetimeError::db("clear tracking snapshot"))?;
                }
            }
            Ok(())
        })
    }
}

/// Session-scoped backend: totals last only as long as the owning process.
#[derive(Default)]
pub struct MemoryStore {
    totals: HashMap<String, u64>,
    snapshot: Option<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TotalsStore for MemoryStore {
    fn total(&self, site_key: &str) -> Result<u64> {
        Ok(self.totals.get(site_key).copied().unwrap_or(0))
    }

    fn set_total(&mut self, site_key: &str, seconds: u64) -> Result<()> {
        self.totals.insert(site_key.to_string(), seconds);
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save_snapshot(&mut self, snapshot: Option<&Snapshot>) -> Result<()> {
        self.snapshot = snapshot.cloned();
        Ok(())
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
