//! Shared tracker state behind the daemon's single mutex.
//!
//! All transitions and queries go through one lock, so a `GET_TIME` query
//! observes either the pre- or post-transition state in full, never a
//! partial mix. Store failures are absorbed here: the handler logs and
//! waits for the next event.

use std::sync::Mutex;

use chrono::Utc;
use tracing::{info, warn};

use sitetime_core::store::TotalsStore;
use sitetime_core::Tracker;
use sitetime_daemon_protocol::{TabEventEnvelope, TabEventType, TimeReport};

pub struct SharedState {
    tracker: Mutex<Tracker>,
}

impl SharedState {
    /// Wraps the store in a tracker and resumes any session recorded in the
    /// durable snapshot, so a restart does not reset the running session.
    pub fn new(store: Box<dyn TotalsStore + Send>) -> Self {
        let mut tracker = Tracker::new(store);
        match tracker.resume(Utc::now()) {
            Ok(()) => {
                if let Some(site) = tracker.active_site() {
                    info!(site = %site, "Resumed tracking session from snapshot");
                }
            }
            Err(err) => {
                warn!(error = %err, "Failed to resume tracking session; starting idle");
            }
        }
        Self {
            tracker: Mutex::new(tracker),
        }
    }

    pub fn apply_tab_event(&self, event: &TabEventEnvelope) {
        let now = Utc::now();
        let mut tracker = self.lock();

        let result = match event.event_type {
            TabEventType::Activated | TabEventType::Updated => {
                match event.url.as_deref() {
                    Some(url) => tracker.on_navigate(url, now),
                    // Validation requires a URL for these variants; an event
                    // that slipped through is skipped, state unchanged.
                    None => {
                        warn!(event_id = %event.event_id, "Navigation event without URL; skipping");
                        return;
                    }
                }
            }
            TabEventType::Removed => tracker.on_tab_removed(now),
            TabEventType::Suspend => tracker.suspend(now),
        };

        match result {
            Ok(()) => {
                info!(
                    event_type = ?event.event_type,
                    site = ?tracker.active_site(),
                    "Applied tab event"
                );
            }
            Err(err) => {
                warn!(error = %err, event_id = %event.event_id, "Failed to apply tab event");
            }
        }
    }

    pub fn time_report(&self) -> TimeReport {
        self.lock().report(Utc::now())
    }

    /// Persists the running total without ending the session.
    pub fn flush(&self) {
        if let Err(err) = self.lock().flush(Utc::now()) {
            warn!(error = %err, "Periodic flush failed");
        }
    }

    /// Best-effort flush-and-stop on a termination signal.
    pub fn suspend(&self) {
        if let Err(err) = self.lock().suspend(Utc::now()) {
            warn!(error = %err, "Suspend flush failed");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tracker> {
        // A poisoned lock means a handler panicked; the tracker itself is
        // still consistent because every transition persists as it goes.
        match self.tracker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitetime_core::MemoryStore;

    fn envelope(event_type: TabEventType, url: Option<&str>) -> TabEventEnvelope {
        TabEventEnvelope {
            event_id: "evt-test".to_string(),
            recorded_at: Utc::now().to_rfc3339(),
            event_type,
            url: url.map(str::to_string),
            tab_id: Some(1),
        }
    }

    #[test]
    fn idle_state_reports_zeros() {
        let state = SharedState::new(Box::new(MemoryStore::new()));
        assert_eq!(state.time_report(), TimeReport::idle());
    }

    #[test]
    fn activation_then_query_reports_site() {
        let state = SharedState::new(Box::new(MemoryStore::new()));
        state.apply_tab_event(&envelope(
            TabEventType::Activated,
            Some("https://www.facebook.com/feed"),
        ));

        let report = state.time_report();
        assert_eq!(report.current_website.as_deref(), Some("facebook.com"));
        assert!(report.session_time <= 1);
    }

    #[test]
    fn removed_event_clears_state() {
        let state = SharedState::new(Box::new(MemoryStore::new()));
        state.apply_tab_event(&envelope(
            TabEventType::Updated,
            Some("https://www.youtube.com/"),
        ));
        state.apply_tab_event(&envelope(TabEventType::Removed, None));
        assert_eq!(state.time_report(), TimeReport::idle());
    }

    #[test]
    fn navigation_event_without_url_is_skipped() {
        let state = SharedState::new(Box::new(MemoryStore::new()));
        state.apply_tab_event(&envelope(
            TabEventType::Activated,
            Some("https://www.reddit.com/"),
        ));
        state.apply_tab_event(&envelope(TabEventType::Activated, None));

        // State unchanged by the malformed event.
        let report = state.time_report();
        assert_eq!(report.current_website.as_deref(), Some("reddit.com"));
    }
}
