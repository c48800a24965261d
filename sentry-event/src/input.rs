use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys describing the error itself, which never count as auxiliary fields.
pub const RESERVED_FIELDS: [&str; 3] = ["name", "message", "stack"];

/// The error being reported.
///
/// Besides its name, message and stack, an error may carry any number of auxiliary
/// fields (an HTTP status, a job id, ...). These are reported under `extra`. When
/// deserializing, every unknown key lands in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ErrorInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Describe any Rust error: the name is the short type name and the message is
    /// its `Display` output.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self {
            name: short_type_name::<E>().to_owned(),
            message: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }

    pub fn with_stack(mut self, stack: &str) -> Self {
        self.stack = Some(stack.to_owned());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    /// Auxiliary fields, without any of the reserved keys.
    pub fn extra_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// The HTTP request that was being served when the error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestInfo {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_owned(),
            url: url.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_owned(), value.to_owned());
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_owned());
        self
    }
}

/// Capture an `http::Request`. Header values that are not visible ASCII are skipped,
/// repeated headers are joined with `, `.
impl<B: AsRef<str>> From<&http::Request<B>> for RequestInfo {
    fn from(request: &http::Request<B>) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();

        for (name, value) in request.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };

            headers
                .entry(name.as_str().to_owned())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_owned());
        }

        let body = request.body().as_ref();

        Self {
            method: request.method().to_string(),
            url: request.uri().to_string(),
            headers,
            body: (!body.is_empty()).then(|| body.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct QuotaExceeded;

    impl std::fmt::Display for QuotaExceeded {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "quota exceeded")
        }
    }

    impl std::error::Error for QuotaExceeded {}

    #[test]
    fn test_from_error_uses_short_type_name() {
        let info = ErrorInfo::from_error(&QuotaExceeded);

        assert_eq!(info.name, "QuotaExceeded");
        assert_eq!(info.message.as_deref(), Some("quota exceeded"));
        assert_eq!(info.stack, None);
        assert!(info.fields.is_empty());
    }

    #[test]
    fn test_extra_fields_skip_reserved_keys() {
        let info = ErrorInfo::new("HttpError")
            .with_message("bad gateway")
            .with_field("status", 502)
            .with_field("name", "shadowed")
            .with_field("stack", "shadowed");

        assert_eq!(
            serde_json::Value::Object(info.extra_fields()),
            json!({"status": 502})
        );
    }

    #[test]
    fn test_deserialize_collects_unknown_keys() {
        let info: ErrorInfo = serde_json::from_value(json!({
            "name": "TypeError",
            "message": "x is undefined",
            "stack": "TypeError: x is undefined\n    at main (index.js:1:1)",
            "code": "E_UNDEFINED",
            "retryable": false
        }))
        .unwrap();

        assert_eq!(info.name, "TypeError");
        assert_eq!(info.message.as_deref(), Some("x is undefined"));
        assert!(info.stack.is_some());
        assert_eq!(
            serde_json::Value::Object(info.extra_fields()),
            json!({"code": "E_UNDEFINED", "retryable": false})
        );
    }

    #[test]
    fn test_request_info_from_http_request() {
        let request = http::Request::builder()
            .method("POST")
            .uri("https://example.com/jobs?id=3")
            .header("content-type", "application/json")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(r#"{"id":3}"#)
            .unwrap();

        let info = RequestInfo::from(&request);

        assert_eq!(info.method, "POST");
        assert_eq!(info.url, "https://example.com/jobs?id=3");
        assert_eq!(info.headers["content-type"], "application/json");
        assert_eq!(info.headers["accept"], "text/html, application/json");
        assert_eq!(info.body.as_deref(), Some(r#"{"id":3}"#));
    }

    #[test]
    fn test_request_info_from_http_request_without_body() {
        let request = http::Request::builder()
            .uri("https://example.com/")
            .body("")
            .unwrap();

        let info = RequestInfo::from(&request);

        assert_eq!(info.method, "GET");
        assert_eq!(info.body, None);
        assert!(info.headers.is_empty());
    }
}
