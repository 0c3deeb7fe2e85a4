use reqwest::{header, Method};
use serde::Serialize;

use crate::{context::Context, error::TransportError, ClientError, RequestConfig, Result};

/// Status and body of one completed HTTP exchange.
#[derive(Debug)]
pub(crate) struct Attempt {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs exactly one HTTP call for `config`.
///
/// The payload is sent as a JSON body. The whole response body is read before
/// returning; on any failure no partial body is handed back.
pub(crate) async fn invoke<Req>(
    http: &reqwest::Client,
    config: &RequestConfig,
    ctx: &Context,
    request: &Req,
) -> Result<Attempt>
where
    Req: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(request).map_err(ClientError::Encode)?;
    let request = build_request(http, config, payload)?;

    let ctx = if config.timeout().is_zero() {
        ctx.clone()
    } else {
        ctx.child_with_timeout(config.timeout())
    };
    if let Some(reason) = ctx.err() {
        return Err(ClientError::Transport(reason.into()));
    }

    let exchange = async {
        let response = http
            .execute(request)
            .await
            .map_err(|err| ClientError::Transport(TransportError::Network(err)))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ClientError::ReadBody)?;
        Ok::<_, ClientError>(Attempt {
            status,
            body: body.to_vec(),
        })
    };

    tokio::select! {
        result = exchange => result,
        reason = ctx.done() => Err(ClientError::Transport(reason.into())),
    }
}

fn build_request(
    http: &reqwest::Client,
    config: &RequestConfig,
    payload: Vec<u8>,
) -> Result<reqwest::Request> {
    let method = Method::from_bytes(config.method().as_bytes()).map_err(|err| {
        ClientError::Build(format!("invalid method '{}': {err}", config.method()))
    })?;

    let mut builder = http.request(method, config.url());
    let has_content_type = config
        .headers()
        .keys()
        .any(|name| name.eq_ignore_ascii_case(header::CONTENT_TYPE.as_str()));
    if !has_content_type {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    for (name, value) in config.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(payload)
        .build()
        .map_err(|err| ClientError::Build(format!("{err} (url: {})", config.url())))
}
