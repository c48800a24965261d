use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

use crate::dsn::Dsn;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "SENTRY_DSN")]
    pub dsn: Dsn,

    #[envconfig(from = "APP_NAME")]
    pub app: String,

    #[envconfig(from = "RELEASE", default = "unknown")]
    pub release: String,

    #[envconfig(from = "ENVIRONMENT")]
    pub environment: Option<String>,

    #[envconfig(default = "5000")]
    pub request_timeout: EnvMsDuration,
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}
