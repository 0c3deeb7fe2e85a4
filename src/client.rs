use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    context::Context,
    events::{default_sink, Event, EventKind, EventSink},
    transport::{self, Attempt},
    ClientError, Outcome, RequestConfig, Result,
};

/// Statuses at or above this value are retried.
const SERVER_ERROR_THRESHOLD: u16 = 500;

#[derive(Clone)]
/// JSON HTTP client that retries one logical call with exponential backoff.
pub struct RestClient {
    http: reqwest::Client,
    config: RequestConfig,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a client for `config` with the default event sink.
    pub fn new(config: RequestConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            sink: default_sink(),
        }
    }

    /// Uses a preconfigured `reqwest` client, e.g. to share its connection pool.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Sends retry, failure and success events to `sink`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Like [`RestClient::with_sink`] for a sink shared with other clients.
    pub fn with_shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the request configuration.
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Sends `request` as JSON and decodes the JSON response into `Resp`.
    ///
    /// Attempts are made sequentially, up to the policy's `max_attempts`.
    /// A response below 500 resolves the call immediately, whatever its
    /// class. Server errors and transport failures are retried after
    /// `interval_seconds * backoff_rate^n`, where `n` is the number of
    /// attempts made so far.
    ///
    /// `ctx` bounds both the backoff sleeps and each network call. Once it
    /// is done the remaining attempts fail fast with its reason.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use rest_retry::{Context, RequestConfig, RestClient};
    ///
    /// # async fn run() -> rest_retry::Result<()> {
    /// let config = RequestConfig::new("GET", "http://localhost:8080")
    ///     .with_timeout(Duration::from_secs(10))
    ///     .with_max_attempts(3)
    ///     .with_interval_seconds(1.0)
    ///     .with_backoff_rate(2.0);
    /// let client = RestClient::new(config);
    ///
    /// let ctx = Context::with_timeout(Duration::from_secs(60));
    /// let outcome = client
    ///     .execute::<_, serde_json::Value>(&ctx, &())
    ///     .await?;
    /// println!("{} {}", outcome.status, outcome.value);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<Req, Resp>(&self, ctx: &Context, request: &Req) -> Result<Outcome<Resp>>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let policy = *self.config.retry();
        policy.validate()?;

        let mut retries = 0u32;
        let mut attempts = 0u32;
        let mut wait = Duration::ZERO;
        let mut last = None;

        for attempt in 0..policy.max_attempts {
            ctx.sleep(wait).await;

            let result = transport::invoke(&self.http, &self.config, ctx, request).await;
            attempts += 1;

            let retryable = match &result {
                Ok(response) => response.status >= SERVER_ERROR_THRESHOLD,
                Err(err) => err.is_retryable(),
            };
            if !retryable {
                last = Some(result);
                break;
            }

            retries += 1;
            wait = policy.delay_after(attempt);
            if attempts < policy.max_attempts {
                self.record_retry(&result, attempts, retries, wait);
            }
            last = Some(result);
        }

        let Some(result) = last else {
            return Err(ClientError::Config(
                "max_attempts must be at least 1".to_owned(),
            ));
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.record_terminal(EventKind::Failure, None, Some(&err), attempts, retries);
                return Err(err);
            }
        };

        if response.status >= SERVER_ERROR_THRESHOLD {
            let err = ClientError::RetriesExhausted {
                status: response.status,
                attempts,
            };
            self.record_terminal(
                EventKind::Failure,
                Some(response.status),
                Some(&err),
                attempts,
                retries,
            );
            return Err(err);
        }

        match serde_json::from_slice::<Resp>(&response.body) {
            Ok(value) => {
                self.record_terminal(
                    EventKind::Success,
                    Some(response.status),
                    None,
                    attempts,
                    retries,
                );
                Ok(Outcome {
                    status: response.status,
                    value,
                })
            }
            Err(source) => {
                let err = ClientError::Decode {
                    status: response.status,
                    source,
                };
                self.record_terminal(
                    EventKind::Failure,
                    Some(response.status),
                    Some(&err),
                    attempts,
                    retries,
                );
                Err(err)
            }
        }
    }

    fn record_retry(&self, result: &Result<Attempt>, attempt: u32, retries: u32, wait: Duration) {
        let (status, error) = match result {
            Ok(response) => (Some(response.status), None),
            Err(err) => (None, Some(err.to_string())),
        };
        self.sink.record(&Event {
            kind: EventKind::Retry,
            url: self.config.url().to_owned(),
            status,
            error,
            attempt,
            retries,
            wait,
            timestamp: Utc::now(),
        });
    }

    fn record_terminal(
        &self,
        kind: EventKind,
        status: Option<u16>,
        error: Option<&ClientError>,
        attempts: u32,
        retries: u32,
    ) {
        self.sink.record(&Event {
            kind,
            url: self.config.url().to_owned(),
            status,
            error: error.map(ToString::to_string),
            attempt: attempts,
            retries,
            wait: Duration::ZERO,
            timestamp: Utc::now(),
        });
    }
}
