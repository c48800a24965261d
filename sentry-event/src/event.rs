use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::event_id::EventId;
use crate::frames::{parse_stack, StackFrame};
use crate::input::{ErrorInfo, RequestInfo};
use crate::time::{SystemTime, TimeSource};

/// Reported as the platform of every event; it selects how Sentry reads our frames.
pub const PLATFORM: &str = "javascript";

/// Environment used when the caller does not name one.
pub const DEFAULT_ENVIRONMENT: &str = "ENV";

/// Placeholder for errors without any message text.
pub const NO_MESSAGE: &str = "<no message>";

/// An event as accepted by Sentry's `store` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentryEvent {
    pub event_id: EventId,
    pub message: String,
    pub exception: ExceptionList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, Map<String, Value>>>,
    pub tags: Tags,
    pub platform: &'static str,
    pub environment: String,
    pub server_name: String,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<EventRequest>,
    pub release: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionList {
    pub values: Vec<Exception>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exception {
    #[serde(rename = "type")]
    pub exception_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
}

/// Frames ordered from the oldest call to the one that raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stacktrace {
    pub frames: Vec<StackFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tags {
    pub app: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRequest {
    pub method: String,
    pub url: String,
    pub query_string: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl EventRequest {
    /// Requests whose URL cannot be parsed carry no useful context and are left out.
    fn from_request(request: &RequestInfo) -> Option<Self> {
        let url = Url::parse(&request.url).ok()?;
        let query_string = match url.query() {
            Some(query) if !query.is_empty() => format!("?{query}"),
            _ => String::new(),
        };

        Some(Self {
            method: request.method.clone(),
            url: request.url.clone(),
            query_string,
            headers: request.headers.clone(),
            data: request.body.clone(),
        })
    }
}

/// Build `SentryEvent`s for one application and release.
///
/// ```
/// use sentry_event::event::EventBuilder;
/// use sentry_event::input::ErrorInfo;
///
/// let error = ErrorInfo::new("TypeError").with_message("x is undefined");
/// let event = EventBuilder::new("billing", "abc123")
///     .environment(Some("production"))
///     .build(&error, None);
///
/// assert_eq!(event.message, "TypeError: x is undefined");
/// assert_eq!(event.server_name, "billing-production");
/// ```
#[derive(Clone, Debug)]
pub struct EventBuilder<'a, T = SystemTime> {
    app: &'a str,
    release: &'a str,
    environment: Option<&'a str>,
    event_id: Option<EventId>,
    time_source: T,
}

impl<'a> EventBuilder<'a> {
    pub fn new(app: &'a str, release: &'a str) -> Self {
        Self {
            app,
            release,
            environment: None,
            event_id: None,
            time_source: SystemTime {},
        }
    }
}

impl<'a, T: TimeSource> EventBuilder<'a, T> {
    /// Set the environment name. `None` and the empty string fall back to `ENV`.
    pub fn environment(mut self, environment: Option<&'a str>) -> Self {
        self.environment = environment;
        self
    }

    /// Pin the event id instead of generating a fresh one per event.
    pub fn event_id(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn time_source<U: TimeSource>(self, time_source: U) -> EventBuilder<'a, U> {
        EventBuilder {
            app: self.app,
            release: self.release,
            environment: self.environment,
            event_id: self.event_id,
            time_source,
        }
    }

    /// Build the event for an error and, if one was being served, its request.
    pub fn build(&self, error: &ErrorInfo, request: Option<&RequestInfo>) -> SentryEvent {
        let error_type = error.name.clone();

        let message = match error.message.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => NO_MESSAGE,
        };

        // Sentry wants the outermost caller first.
        let mut frames = parse_stack(error.stack.as_deref());
        frames.reverse();
        let stacktrace = (!frames.is_empty()).then_some(Stacktrace { frames });

        let extra_fields = error.extra_fields();
        let extra = (!extra_fields.is_empty())
            .then(|| BTreeMap::from([(error_type.clone(), extra_fields)]));

        let environment = self
            .environment
            .filter(|environment| !environment.is_empty())
            .unwrap_or(DEFAULT_ENVIRONMENT);

        SentryEvent {
            event_id: self.event_id.unwrap_or_default(),
            message: format!("{error_type}: {message}"),
            exception: ExceptionList {
                values: vec![Exception {
                    exception_type: error_type,
                    value: error.message.clone(),
                    stacktrace,
                }],
            },
            extra,
            tags: Tags {
                app: self.app.to_owned(),
            },
            platform: PLATFORM,
            environment: environment.to_owned(),
            server_name: format!("{}-{}", self.app, environment),
            timestamp: self.time_source.unix_timestamp(),
            request: request.and_then(EventRequest::from_request),
            release: self.release.to_owned(),
        }
    }
}

/// Build an event with a fresh id and the current time.
pub fn to_sentry_event(
    error: &ErrorInfo,
    request: Option<&RequestInfo>,
    app: &str,
    release: &str,
    environment: Option<&str>,
) -> SentryEvent {
    EventBuilder::new(app, release)
        .environment(environment)
        .build(error, request)
}
