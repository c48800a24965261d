use std::sync::Arc;
use std::time;

use sentry_event::event::{EventBuilder, SentryEvent};
use sentry_event::input::{ErrorInfo, RequestInfo};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::error;

use crate::delivery::{deliver, DeliveryOutcome, Endpoint};
use crate::transport::{HttpTransport, Transport};

pub const DEFAULT_REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(5);

/// An error together with the request that was being served, as read by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorReport {
    pub error: ErrorInfo,
    #[serde(default)]
    pub request: Option<RequestInfo>,
}

/// Reports errors of one application to one Sentry project.
pub struct Reporter<T = HttpTransport> {
    transport: Arc<T>,
    endpoint: Endpoint,
    app: String,
    release: String,
    environment: Option<String>,
}

impl<T> Clone for Reporter<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            endpoint: self.endpoint.clone(),
            app: self.app.clone(),
            release: self.release.clone(),
            environment: self.environment.clone(),
        }
    }
}

impl<T: Transport + 'static> Reporter<T> {
    pub fn new(
        transport: T,
        endpoint: Endpoint,
        app: &str,
        release: &str,
        environment: Option<&str>,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            endpoint,
            app: app.to_owned(),
            release: release.to_owned(),
            environment: environment.map(str::to_owned),
        }
    }

    /// Build an event for `error` and deliver it.
    pub async fn report(
        &self,
        error: &ErrorInfo,
        request: Option<&RequestInfo>,
    ) -> DeliveryOutcome {
        let event = EventBuilder::new(&self.app, &self.release)
            .environment(self.environment.as_deref())
            .build(error, request);

        self.send(&event).await
    }

    /// Deliver an already built event.
    pub async fn send(&self, event: &SentryEvent) -> DeliveryOutcome {
        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                error!(event_id = %event.event_id, error = %e, "failed to serialize event");
                return DeliveryOutcome::Unsendable;
            }
        };

        deliver(self.transport.as_ref(), &self.endpoint, &body).await
    }

    /// Report on a separate task so the caller never waits on Sentry. Awaiting the
    /// handle is optional.
    pub fn report_in_background(
        &self,
        error: ErrorInfo,
        request: Option<RequestInfo>,
    ) -> JoinHandle<DeliveryOutcome> {
        let reporter = self.clone();

        tokio::spawn(async move { reporter.report(&error, request.as_ref()).await })
    }
}

/// Report an error to sentry.io, best effort.
///
/// `dsn` is the public key of the project's DSN (`https://<key>@sentry.io/<project_id>`).
/// Delivery failures are only visible in the logs: this never fails and never panics,
/// whatever happens to the event.
pub async fn log(
    error: &ErrorInfo,
    request: Option<&RequestInfo>,
    app: &str,
    release: &str,
    project_id: &str,
    dsn: &str,
    env: Option<&str>,
) {
    log_to(Endpoint::new(project_id, dsn), error, request, app, release, env).await
}

/// Like [`log`], against any Sentry installation: self-hosted, or a relay in front of
/// sentry.io.
pub async fn log_to(
    endpoint: Endpoint,
    error: &ErrorInfo,
    request: Option<&RequestInfo>,
    app: &str,
    release: &str,
    env: Option<&str>,
) {
    let transport = match HttpTransport::new(DEFAULT_REQUEST_TIMEOUT) {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "failed to build http client for sentry");
            return;
        }
    };

    let reporter = Reporter::new(transport, endpoint, app, release, env);
    reporter.report(error, request).await;
}
