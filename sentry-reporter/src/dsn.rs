use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::delivery::Endpoint;
use crate::error::DsnError;

/// A Sentry DSN, as shown in a project's client keys settings:
/// `https://<public_key>@<host>/<project_id>`.
///
/// Hosts under a path prefix (`https://key@example.com/sentry/42`) are supported; the
/// project id is always the last path segment. A secret key after the public one
/// (`key:secret@...`) is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    key: String,
    host: String,
    project_id: String,
}

impl Dsn {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Base url of the Sentry installation, without a trailing slash.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl FromStr for Dsn {
    type Err = DsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s.trim())?;

        let key = url.username();
        if key.is_empty() {
            return Err(DsnError::MissingKey);
        }

        let host = url.host_str().ok_or(DsnError::MissingHost)?;

        let path = url.path().trim_matches('/');
        let (prefix, project_id) = match path.rsplit_once('/') {
            Some((prefix, project_id)) => (Some(prefix), project_id),
            None => (None, path),
        };

        if project_id.is_empty() {
            return Err(DsnError::MissingProjectId);
        }

        let mut base = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            base.push_str(&format!(":{port}"));
        }
        if let Some(prefix) = prefix {
            base.push('/');
            base.push_str(prefix);
        }

        Ok(Dsn {
            key: key.to_owned(),
            host: base,
            project_id: project_id.to_owned(),
        })
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (scheme, rest) = self
            .host
            .split_once("://")
            .unwrap_or(("https", self.host.as_str()));
        write!(f, "{}://{}@{}/{}", scheme, self.key, rest, self.project_id)
    }
}

impl From<Dsn> for Endpoint {
    fn from(dsn: Dsn) -> Self {
        Endpoint::new(&dsn.project_id, &dsn.key).with_host(&dsn.host)
    }
}
