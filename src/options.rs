use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::ClientError;

/// Header names whose values are hidden from `Debug` output.
const REDACTED_HEADERS: [&str; 3] = ["authorization", "proxy-authorization", "x-api-key"];

/// Configures how many times a call is attempted and how long to wait between attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base backoff unit in seconds.
    pub interval_seconds: f64,
    /// Exponential multiplier applied per retry.
    pub backoff_rate: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            interval_seconds: 0.0,
            backoff_rate: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Rejects policies the retry loop cannot run.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_attempts == 0 {
            return Err(ClientError::Config(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        if !self.interval_seconds.is_finite() || self.interval_seconds < 0.0 {
            return Err(ClientError::Config(format!(
                "interval_seconds must be a non-negative number, got {}",
                self.interval_seconds
            )));
        }
        if !self.backoff_rate.is_finite() || self.backoff_rate < 0.0 {
            return Err(ClientError::Config(format!(
                "backoff_rate must be a non-negative number, got {}",
                self.backoff_rate
            )));
        }
        Ok(())
    }

    /// Wait before the attempt that follows attempt index `attempt` (zero-based).
    ///
    /// Computed as `interval_seconds * backoff_rate^(attempt + 1)`, so the
    /// first retry already waits one full multiplication of the base unit.
    /// Values too large for a [`Duration`] saturate to [`Duration::MAX`].
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_add(1)).unwrap_or(i32::MAX);
        let seconds = self.interval_seconds * self.backoff_rate.powi(exponent);
        if seconds.is_nan() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Describes the single HTTP call a [`crate::RestClient`] performs.
///
/// Values are immutable once built: every `with_*` method consumes the
/// config and returns the updated one.
#[derive(Clone, PartialEq)]
pub struct RequestConfig {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: HashMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if is_redacted_header(name) {
                    "<redacted>"
                } else {
                    value.as_str()
                };
                (name.as_str(), shown)
            })
            .collect();
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl RequestConfig {
    /// Creates a config for `method` on `url` with a single attempt and no timeout.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            timeout: Duration::ZERO,
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a config from environment variables.
    ///
    /// Reads:
    /// - `REST_RETRY_URL` — target endpoint (required)
    /// - `REST_RETRY_METHOD` — HTTP verb, defaults to `GET`
    /// - `REST_RETRY_TIMEOUT_MS` — per-attempt timeout in milliseconds
    /// - `REST_RETRY_MAX_ATTEMPTS` — total attempts
    /// - `REST_RETRY_INTERVAL_SECONDS` — base backoff unit
    /// - `REST_RETRY_BACKOFF_RATE` — exponential multiplier
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rest_retry::RequestConfig;
    ///
    /// let config = RequestConfig::from_env().expect("missing REST_RETRY_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("REST_RETRY_URL")
            .ok_or_else(|| "missing REST_RETRY_URL environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("REST_RETRY_URL is set but empty".to_owned());
        }
        let method = lookup("REST_RETRY_METHOD")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "GET".to_owned());

        let mut config = Self::new(method.trim(), url.trim());
        if let Some(ms) = parse_var::<u64>(&lookup, "REST_RETRY_TIMEOUT_MS")? {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "REST_RETRY_MAX_ATTEMPTS")? {
            config = config.with_max_attempts(attempts);
        }
        if let Some(seconds) = parse_var::<f64>(&lookup, "REST_RETRY_INTERVAL_SECONDS")? {
            config = config.with_interval_seconds(seconds);
        }
        if let Some(rate) = parse_var::<f64>(&lookup, "REST_RETRY_BACKOFF_RATE")? {
            config = config.with_backoff_rate(rate);
        }
        Ok(config)
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the target URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Adds one header, replacing any previous value for the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replaces all headers.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self
    }

    /// Sets the per-attempt timeout. Zero means no explicit timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the total number of attempts, including the first.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    /// Sets the base backoff unit in seconds.
    pub fn with_interval_seconds(mut self, interval_seconds: f64) -> Self {
        self.retry.interval_seconds = interval_seconds;
        self
    }

    /// Sets the exponential backoff multiplier.
    pub fn with_backoff_rate(mut self, backoff_rate: f64) -> Self {
        self.retry.backoff_rate = backoff_rate;
        self
    }

    /// Replaces the whole retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

fn is_redacted_header(name: &str) -> bool {
    REDACTED_HEADERS
        .iter()
        .any(|redacted| name.eq_ignore_ascii_case(redacted))
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> std::result::Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| format!("invalid {key} value '{raw}': {err}")),
    }
}
