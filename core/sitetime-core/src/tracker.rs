//! The session-tracking state machine.
//!
//! At most one site is timed at a time. The active pair (site key, session
//! start) lives inside one `Option` so it can never be half-set, and every
//! transition that changes the active site or banks time persists through
//! the store before the handler returns. The host may tear the process down
//! at any moment; the periodic [`Tracker::flush`] bounds how much time a
//! hard kill can lose.
//!
//! All operations take `now` explicitly so tests run on simulated time.

use chrono::{DateTime, Utc};

use crate::classify::classify;
use crate::error::Result;
use crate::store::{Snapshot, TotalsStore};
use sitetime_daemon_protocol::TimeReport;

#[derive(Debug, Clone)]
struct ActiveSession {
    site_key: String,
    /// Seconds accumulated for this site across all prior sessions, loaded
    /// when the session starts. Never changes mid-session.
    banked_seconds: u64,
    started_at: DateTime<Utc>,
}

impl ActiveSession {
    /// Clamped at zero in case the wall clock was adjusted backward.
    fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }
}

pub struct Tracker {
    store: Box<dyn TotalsStore + Send>,
    active: Option<ActiveSession>,
}

impl Tracker {
    pub fn new(store: Box<dyn TotalsStore + Send>) -> Self {
        Self {
            store,
            active: None,
        }
    }

    /// Handles a focus or navigation event for `url`.
    ///
    /// Same-site events are a strict no-op: no flush, no session restart.
    /// A tracked-site switch banks the outgoing session first; an untracked
    /// URL ends any running session.
    pub fn on_navigate(&mut self, url: &str, now: DateTime<Utc>) -> Result<()> {
        let classification = classify(url);

        if let Some(active) = &self.active {
            if active.site_key == classification.site_key {
                return Ok(());
            }
        }

        self.stop(now)?;
        if classification.is_tracked {
            self.start(classification.site_key, now)?;
        }
        Ok(())
    }

    /// The focused tab was closed; end any running session.
    pub fn on_tab_removed(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.stop(now)
    }

    /// Host shutdown/suspend signal: bank the live session and go idle.
    pub fn suspend(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.stop(now)
    }

    /// Writes the running total without
    /// ending the session, so a hard kill loses at most one flush interval.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Result<()> {
        if let Some(active) = &self.active {
            let total = active.banked_seconds + active.elapsed_seconds(now);
            let site_key = active.site_key.clone();
            self.store.set_total(&site_key, total)?;
        }
        Ok(())
    }

    /// Reconstructs state after a process restart from the durable snapshot.
    ///
    /// The session is *not* reset: `started_at` comes from the snapshot, so
    /// elapsed time spans the restart. The host re-delivers a focus event
    /// for the current tab right after resume, which re-evaluates it.
    pub fn resume(&mut self, _now: DateTime<Utc>) -> Result<()> {
        self.active = None;
        if let Some(snapshot) = self.store.load_snapshot()? {
            let banked_seconds = self.store.total(&snapshot.site_key)?;
            self.active = Some(ActiveSession {
                site_key: snapshot.site_key,
                banked_seconds,
                started_at: snapshot.started_at,
            });
        }
        Ok(())
    }

    /// Read-only query; safe against concurrent transitions because the
    /// caller serializes access to the whole tracker.
    pub fn report(&self, now: DateTime<Utc>) -> TimeReport {
        match &self.active {
            Some(active) => {
                let session_time = active.elapsed_seconds(now);
                TimeReport {
                    total_time: active.banked_seconds + session_time,
                    current_website: Some(active.site_key.clone()),
                    session_time,
                }
            }
            None => TimeReport::idle(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_site(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.site_key.as_str())
    }

    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|active| active.started_at)
    }

    fn start(&mut self, site_key: String, now: DateTime<Utc>) -> Result<()> {
        let banked_seconds = self.store.total(&site_key)?;
        let snapshot = Snapshot {
            site_key: site_key.clone(),
            started_at: now,
        };
        self.active = Some(ActiveSession {
            site_key,
            banked_seconds,
            started_at: now,
        });
        self.store.save_snapshot(Some(&snapshot))?;
        Ok(())
    }

    fn stop(&mut self, now: DateTime<Utc>) -> Result<()> {
        if let Some(active) = self.active.take() {
            let total = active.banked_seconds + active.elapsed_seconds(now);
            self.store.set_total(&active.site_key, total)?;
            self.store.save_snapshot(None)?;
        }
        Ok(())
    }
}
