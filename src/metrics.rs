//! Request accounting for page sessions.
//!
//! Aggregated counters alongside lightweight timing helpers for transport
//! latency measurements, so suites can report how much traffic a scenario
//! generated.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::http::Method;

/// Aggregated counters for requests issued by a session.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMetrics {
    pub get_requests: u64,
    pub post_requests: u64,
    pub put_requests: u64,
    pub patch_requests: u64,
    pub delete_requests: u64,

    pub form_submissions: u64,
    pub link_clicks: u64,

    pub total_requests: u64,
    pub total_transport_ms: u64,
}

impl SessionMetrics {
    /// Record a completed request and update cumulative totals.
    pub fn record_request(&mut self, method: Method, transport_ms: u64) {
        match method {
            Method::Get => self.get_requests += 1,
            Method::Post => self.post_requests += 1,
            Method::Put => self.put_requests += 1,
            Method::Patch => self.patch_requests += 1,
            Method::Delete => self.delete_requests += 1,
        }

        self.total_requests += 1;
        self.total_transport_ms += transport_ms;
    }

    pub fn record_submission(&mut self) {
        self.form_submissions += 1;
    }

    pub fn record_click(&mut self) {
        self.link_clicks += 1;
    }

    /// Merge the values from another metrics instance into this one.
    pub fn merge(&mut self, other: &SessionMetrics) {
        self.get_requests += other.get_requests;
        self.post_requests += other.post_requests;
        self.put_requests += other.put_requests;
        self.patch_requests += other.patch_requests;
        self.delete_requests += other.delete_requests;

        self.form_submissions += other.form_submissions;
        self.link_clicks += other.link_clicks;

        self.total_requests += other.total_requests;
        self.total_transport_ms += other.total_transport_ms;
    }
}

/// Start a transport timer using [`Instant::now`].
pub fn start_transport_timer() -> Instant {
    Instant::now()
}

/// Return the elapsed milliseconds since the provided start instant.
pub fn transport_time_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Helper for tests to convert milliseconds to [`Duration`].
pub fn duration_from_millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
