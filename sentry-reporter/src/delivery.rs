//! Deliver serialized events to Sentry's `store` endpoint with bounded retries.
use http::StatusCode;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::DeliveryError;
use crate::transport::Transport;

pub const DEFAULT_HOST: &str = "https://sentry.io";

/// Version of the Sentry protocol spoken by this client.
pub const SENTRY_VERSION: u32 = 7;
pub const CLIENT_NAME: &str = "sentry-reporter";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Highest attempt index. Attempts are numbered from 0 through `RETRIES` inclusive, so
/// an event is sent at most `MAX_ATTEMPTS` times.
pub const RETRIES: u32 = 5;
pub const MAX_ATTEMPTS: u32 = RETRIES + 1;

/// Where events for one Sentry project are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    project_id: String,
    key: String,
}

impl Endpoint {
    pub fn new(project_id: &str, key: &str) -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            project_id: project_id.to_owned(),
            key: key.to_owned(),
        }
    }

    /// Send to a different Sentry installation than sentry.io.
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.trim_end_matches('/').to_owned();
        self
    }

    pub fn store_url(&self) -> String {
        format!("{}/api/{}/store/", self.host, self.project_id)
    }

    pub fn auth_header(&self) -> String {
        format!(
            "Sentry sentry_version={},sentry_client={}/{},sentry_key={}",
            SENTRY_VERSION, CLIENT_NAME, CLIENT_VERSION, self.key
        )
    }
}

/// How delivery of one event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered 200 on the `attempts`-th try.
    Delivered { attempts: u32 },
    /// Every attempt failed and the event was dropped.
    Exhausted { attempts: u32 },
    /// The event could not be serialized, so nothing was sent.
    Unsendable,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Send a serialized event, retrying right away on anything but a 200.
///
/// Attempts are strictly sequential. Failures are logged and never returned as errors:
/// the outcome is informational and callers are free to ignore it.
pub async fn deliver<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Endpoint,
    body: &str,
) -> DeliveryOutcome {
    let url = endpoint.store_url();
    let auth = endpoint.auth_header();

    for attempt in 0..=RETRIES {
        metrics::counter!("sentry_delivery_attempts_total").increment(1);

        match send_event(transport, &url, &auth, body).await {
            Ok(()) => {
                debug!(attempt, "delivered event to sentry");
                metrics::counter!("sentry_events_delivered_total").increment(1);

                return DeliveryOutcome::Delivered {
                    attempts: attempt + 1,
                };
            }
            Err(DeliveryError::UnexpectedStatus { status, body: response }) => {
                error!(
                    http_status = status.as_u16(),
                    attempt,
                    response = %response,
                    "sentry rejected event"
                );
            }
            Err(DeliveryError::TransportError(e)) => {
                error!(attempt, error = %e, "failed to send event to sentry");
            }
        }
    }

    warn!(attempts = MAX_ATTEMPTS, "giving up on delivering event to sentry");
    metrics::counter!("sentry_events_dropped_total").increment(1);

    DeliveryOutcome::Exhausted {
        attempts: MAX_ATTEMPTS,
    }
}

/// Make a single attempt. Only an exact 200 counts as success.
async fn send_event<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    auth: &str,
    body: &str,
) -> Result<(), DeliveryError> {
    let response = transport.post(url, auth, body).await?;

    if response.status == StatusCode::OK {
        return Ok(());
    }

    Err(DeliveryError::UnexpectedStatus {
        status: response.status,
        body: parse_failure_body(&response.body),
    })
}

/// Sentry explains rejections in a JSON body; anything else is kept as raw text.
fn parse_failure_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::transport::TransportResponse;

    /// Answers with a scripted sequence of results, repeating the last one forever.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<StatusCode, url::ParseError>>>,
        requests: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<StatusCode, url::ParseError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn always(status: StatusCode) -> Self {
            Self::new(vec![Ok(status)])
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(
            &self,
            url: &str,
            auth: &str,
            body: &str,
        ) -> Result<TransportResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_owned(), auth.to_owned(), body.to_owned()));

            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    *script.front().unwrap()
                }
            };

            let status = next?;
            Ok(TransportResponse {
                status,
                body: json!({"error": "event rejected", "code": status.as_u16()}).to_string(),
            })
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("123456", "0000aaaa1111bbbb2222cccc3333dddd")
    }

    #[test]
    fn test_store_url_and_auth_header() {
        let endpoint = endpoint();

        assert_eq!(endpoint.store_url(), "https://sentry.io/api/123456/store/");
        assert_eq!(
            endpoint.auth_header(),
            format!(
                "Sentry sentry_version=7,sentry_client=sentry-reporter/{},sentry_key=0000aaaa1111bbbb2222cccc3333dddd",
                env!("CARGO_PKG_VERSION")
            )
        );

        let endpoint = endpoint.with_host("http://localhost:9000/");
        assert_eq!(endpoint.store_url(), "http://localhost:9000/api/123456/store/");
    }

    #[test]
    fn test_parse_failure_body() {
        assert_eq!(
            parse_failure_body(r#"{"detail": "invalid event"}"#),
            json!({"detail": "invalid event"})
        );
        assert_eq!(
            parse_failure_body("<html>Bad Gateway</html>"),
            json!("<html>Bad Gateway</html>")
        );
        assert_eq!(parse_failure_body(""), json!(""));
    }

    #[tokio::test]
    async fn test_deliver_first_attempt() {
        let transport = ScriptedTransport::always(StatusCode::OK);

        let outcome = deliver(&transport, &endpoint(), r#"{"message":"boom"}"#).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1 });
        assert_eq!(transport.calls(), 1);

        let requests = transport.requests.lock().unwrap();
        let (url, auth, body) = &requests[0];
        assert_eq!(url, "https://sentry.io/api/123456/store/");
        assert_eq!(auth, &endpoint().auth_header());
        assert_eq!(body, r#"{"message":"boom"}"#);
    }

    #[tokio::test]
    async fn test_deliver_gives_up_after_six_attempts() {
        let transport = ScriptedTransport::always(StatusCode::INTERNAL_SERVER_ERROR);

        let outcome = deliver(&transport, &endpoint(), "{}").await;

        assert_eq!(outcome, DeliveryOutcome::Exhausted { attempts: 6 });
        assert_eq!(transport.calls(), 6);
        assert_eq!(MAX_ATTEMPTS, 6);
    }

    #[tokio::test]
    async fn test_deliver_retries_until_success() {
        let transport = ScriptedTransport::new(vec![
            Ok(StatusCode::TOO_MANY_REQUESTS),
            Ok(StatusCode::BAD_GATEWAY),
            Ok(StatusCode::OK),
        ]);

        let outcome = deliver(&transport, &endpoint(), "{}").await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3 });
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_deliver_only_accepts_exactly_200() {
        for status in [StatusCode::CREATED, StatusCode::ACCEPTED, StatusCode::NO_CONTENT] {
            let transport = ScriptedTransport::always(status);

            let outcome = deliver(&transport, &endpoint(), "{}").await;

            assert_eq!(outcome, DeliveryOutcome::Exhausted { attempts: 6 });
            assert_eq!(transport.calls(), 6);
        }
    }

    #[tokio::test]
    async fn test_deliver_retries_transport_errors() {
        let transport = ScriptedTransport::new(vec![
            Err(url::ParseError::EmptyHost),
            Ok(StatusCode::OK),
        ]);

        let outcome = deliver(&transport, &endpoint(), "{}").await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 2 });
        assert_eq!(transport.calls(), 2);

        let transport = ScriptedTransport::new(vec![Err(url::ParseError::EmptyHost)]);
        let outcome = deliver(&transport, &endpoint(), "{}").await;

        assert_eq!(outcome, DeliveryOutcome::Exhausted { attempts: 6 });
        assert!(!outcome.is_delivered());
    }
}
