//! Core library for sitetime - shared logic for the daemon and its clients.
//!
//! The daemon owns the single mutable [`tracker::Tracker`]; clients reuse
//! [`classify`] so that popup and daemon always agree on what counts as a
//! tracked site.

pub mod classify;
pub mod config;
pub mod error;
pub mod store;
pub mod tracker;

pub use classify::{classify, friendly_site_name, Classification, SOCIAL_DOMAINS};
pub use error::{Result, SitetimeError};
pub use store::{MemoryStore, Snapshot, SqliteStore, TotalsStore};
pub use tracker::Tracker;
