//! Utility functions for timestamps, seeds and fingerprints.

mod hashing;
pub mod timestamps;

pub use hashing::{fingerprint, stable_seed};
pub use timestamps::{format_bar_time, iso_timestamp, now_utc, session_open, Timestamp};
