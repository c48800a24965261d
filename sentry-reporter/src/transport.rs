use std::time;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::header;
use tracing::warn;

use crate::error::TransportError;

pub const AUTH_HEADER: &str = "X-Sentry-Auth";

/// What came back from the ingestion endpoint for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends one serialized event to the ingestion endpoint.
///
/// Implementations perform exactly one request per call, with no retries of their
/// own: retrying is up to the delivery loop.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        auth: &str,
        body: &str,
    ) -> Result<TransportResponse, TransportError>;
}

/// A `Transport` backed by a `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: time::Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        auth: &str,
        body: &str,
    ) -> Result<TransportResponse, TransportError> {
        let url: reqwest::Url = url.parse()?;

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(AUTH_HEADER, auth)
            .body(body.to_owned())
            .send()
            .await?;

        // A 200 means the event is stored; its body is never read.
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(TransportResponse {
                status,
                body: String::new(),
            });
        }

        // The failure body only feeds the logs.
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    http_status = status.as_u16(),
                    error = %e,
                    "failed to read sentry response body"
                );
                String::new()
            }
        };

        Ok(TransportResponse { status, body })
    }
}
