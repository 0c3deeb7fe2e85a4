use std::time::Duration;

use rest_retry::{Context, RequestConfig, RestClient};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rest_retry=debug")),
        )
        .init();

    let config = if std::env::var_os("REST_RETRY_URL").is_some() {
        match RequestConfig::from_env() {
            Ok(config) => config,
            Err(err) => anyhow::bail!("invalid configuration: {err}"),
        }
    } else {
        RequestConfig::new("GET", "http://localhost:8080")
            .with_header("Content-Type", "application/json")
            .with_timeout(Duration::from_secs(10))
            .with_interval_seconds(1.0)
            .with_backoff_rate(2.0)
            .with_max_attempts(3)
    };
    let client = RestClient::new(config);

    let ctx = Context::with_timeout(Duration::from_secs(60));
    match client.execute::<_, Value>(&ctx, &()).await {
        Ok(outcome) => {
            tracing::info!(status = outcome.status, response = %outcome.value, "response");
        }
        Err(err) => {
            tracing::error!(status = err.status(), error = %err, "error making request");
        }
    }

    Ok(())
}
