//! Report an error, read as JSON from stdin, to Sentry.
//!
//! The input looks like `{"error": {"name": "TypeError", "message": "...", "stack": "..."},
//! "request": {"method": "GET", "url": "https://..."}}`; `request` is optional.
use envconfig::Envconfig;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sentry_reporter::config::Config;
use sentry_reporter::delivery::{DeliveryOutcome, Endpoint};
use sentry_reporter::error::ReporterError;
use sentry_reporter::reporter::{ErrorReport, Reporter};
use sentry_reporter::transport::HttpTransport;

#[tokio::main]
async fn main() -> Result<(), ReporterError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::init_from_env()?;

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    let report: ErrorReport = serde_json::from_str(&input)?;

    let transport = HttpTransport::new(config.request_timeout.0)?;
    let reporter = Reporter::new(
        transport,
        Endpoint::from(config.dsn),
        &config.app,
        &config.release,
        config.environment.as_deref(),
    );

    match reporter.report(&report.error, report.request.as_ref()).await {
        DeliveryOutcome::Delivered { attempts } => info!(attempts, "reported error to sentry"),
        outcome => warn!(?outcome, "error was not reported to sentry"),
    }

    Ok(())
}
