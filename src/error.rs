use crate::context::ContextError;

/// Status reported for failures that never produced a usable HTTP status.
pub const INTERNAL_FAILURE_STATUS: u16 = 999;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Retry policy or other configuration rejected before any call was made.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Request payload could not be serialized to JSON.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Malformed method, URL or header.
    #[error("request construction error: {0}")]
    Build(String),
    /// Network failure, including cancellation and deadline expiry.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
    /// Response body stream failed after the status was received.
    #[error("response read error: {0}")]
    ReadBody(#[source] reqwest::Error),
    /// HTTP exchange succeeded but the body does not match the expected shape.
    #[error("decode error (http {status}): {source}")]
    Decode {
        /// Status of the exchange whose body failed to decode.
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    /// Every attempt ended with a server error status.
    #[error("retries exhausted after {attempts} attempt(s), last status {status}")]
    RetriesExhausted {
        /// Status returned by the final attempt.
        status: u16,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Failure while sending a request or waiting for its response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Error raised by the HTTP stack.
    #[error(transparent)]
    Network(reqwest::Error),
    /// The call context was cancelled or its deadline passed.
    #[error(transparent)]
    Context(ContextError),
}

impl ClientError {
    /// Status code to report alongside this error.
    ///
    /// Everything except [`ClientError::RetriesExhausted`] reports
    /// [`INTERNAL_FAILURE_STATUS`].
    pub fn status(&self) -> u16 {
        match self {
            Self::RetriesExhausted { status, .. } => *status,
            _ => INTERNAL_FAILURE_STATUS,
        }
    }

    /// Whether the retry loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ReadBody(_))
    }

    /// Whether this error comes from a timeout or an expired deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(TransportError::Context(ContextError::DeadlineExceeded)) => true,
            Self::Transport(TransportError::Network(err)) | Self::ReadBody(err) => err.is_timeout(),
            _ => false,
        }
    }
}

impl From<ContextError> for TransportError {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}
