//! Structured events emitted by the retry loop.
//!
//! The client never logs directly; it hands every [`Event`] to an injected
//! [`EventSink`]. With the `tracing` feature (on by default) the default sink
//! forwards events to `tracing`, otherwise events are dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// What an [`Event`] reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventKind {
    /// An attempt failed with a retryable outcome and another attempt follows.
    ///
    /// The final attempt never produces one: with `max_attempts = N` against
    /// a backend that keeps failing there are `N - 1` retry events, and the
    /// terminal [`EventKind::Failure`] event carries all `N` in `retries`.
    Retry,
    /// The call finished with an error.
    Failure,
    /// The call finished with a decoded response.
    Success,
}

/// One structured observation of a call.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub url: String,
    /// HTTP status of the attempt, when one was received.
    pub status: Option<u16>,
    /// Rendered error of the attempt or call, if any.
    pub error: Option<String>,
    /// One-based attempt number for retries, total attempts otherwise.
    pub attempt: u32,
    /// Retries performed so far.
    pub retries: u32,
    /// Wait before the next attempt; zero for terminal events.
    pub wait: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Receives events from a [`crate::RestClient`].
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn record(&self, event: &Event) {
        self(event)
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &Event) {}
}

/// Forwards events to `tracing`: retries at `warn`, failures at `error`,
/// successes at `debug`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl EventSink for TracingSink {
    fn record(&self, event: &Event) {
        let time = event.timestamp.to_rfc3339();
        let wait_ms = u64::try_from(event.wait.as_millis()).unwrap_or(u64::MAX);
        match event.kind {
            EventKind::Retry => tracing::warn!(
                url = %event.url,
                status = ?event.status,
                error = ?event.error,
                wait_ms,
                attempt = event.attempt,
                time = %time,
                "retrying request"
            ),
            EventKind::Failure => tracing::error!(
                url = %event.url,
                status = ?event.status,
                error = ?event.error,
                attempt = event.attempt,
                retries = event.retries,
                time = %time,
                "request failed"
            ),
            EventKind::Success => tracing::debug!(
                url = %event.url,
                status = ?event.status,
                retries = event.retries,
                time = %time,
                "request done"
            ),
        }
    }
}

pub(crate) fn default_sink() -> Arc<dyn EventSink> {
    #[cfg(feature = "tracing")]
    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
    #[cfg(not(feature = "tracing"))]
    let sink: Arc<dyn EventSink> = Arc::new(NoopSink);
    sink
}
