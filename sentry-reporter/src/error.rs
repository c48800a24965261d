use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a `Transport` while trying to reach the ingestion endpoint.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("error parsing ingestion url")]
    ParseUrlError(#[from] url::ParseError),
    #[error("error sending event: {0}")]
    RequestError(#[from] reqwest::Error),
}

/// Why a single delivery attempt did not succeed. Never surfaced to callers of `log`.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error(transparent)]
    TransportError(#[from] TransportError),
    #[error("ingestion endpoint responded with {status}")]
    UnexpectedStatus { status: StatusCode, body: Value },
}

/// Enumeration of errors related to parsing a Sentry DSN.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DsnError {
    #[error("DSN is not a valid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("DSN has no public key")]
    MissingKey,
    #[error("DSN has no host")]
    MissingHost,
    #[error("DSN has no project id")]
    MissingProjectId,
}

/// Errors that stop the `sentry-reporter` binary before it gets to deliver anything.
#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("invalid configuration: {0}")]
    ConfigError(#[from] envconfig::Error),
    #[error("failed to read error report from stdin")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse error report: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("failed to build http client: {0}")]
    ClientError(#[from] reqwest::Error),
}
