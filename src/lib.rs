//! `rest-retry` is an async JSON HTTP client that retries a single call with
//! exponential backoff.
//!
//! Build a [`RequestConfig`], wrap it in a [`RestClient`] and call
//! [`RestClient::execute`] with a [`Context`] that bounds the whole call.
//! Responses below 500 resolve the call; server errors and transport failures
//! are retried up to the configured number of attempts.

mod client;
mod context;
mod error;
mod events;
mod options;
mod transport;
mod types;

pub use client::RestClient;
pub use context::{CancelHandle, Context, ContextError};
pub use error::{ClientError, TransportError, INTERNAL_FAILURE_STATUS};
#[cfg(feature = "tracing")]
pub use events::TracingSink;
pub use events::{Event, EventKind, EventSink, NoopSink};
pub use options::{RequestConfig, RetryPolicy};
pub use types::Outcome;

pub type Result<T> = std::result::Result<T, ClientError>;
