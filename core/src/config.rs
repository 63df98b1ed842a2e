//! Client configuration.
//!
//! Four knobs: where the web UI lives, the password for `auth.login`, one
//! timeout used for both connect and read, and the opt-in TLS relaxation.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout", rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Accept any certificate and skip hostname checks on `https` URLs.
    /// Insecure; meant for self-signed daemons on a trusted network.
    #[serde(default)]
    pub relax_tls: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("relax_tls", &self.relax_tls)
            .finish()
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, password: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            password: password.to_string(),
            timeout: DEFAULT_TIMEOUT,
            relax_tls: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_relax_tls(mut self, relax_tls: bool) -> Self {
        self.relax_tls = relax_tls;
        self
    }

    /// Read `DELUGE_URL`, `DELUGE_PASSWORD`, `DELUGE_TIMEOUT_MS` and
    /// `DELUGE_RELAX_TLS`. Only the URL is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("DELUGE_URL").ok_or(ConfigError::MissingEnv("DELUGE_URL"))?;
        let password = lookup("DELUGE_PASSWORD").unwrap_or_default();
        let mut config = Self::new(&base_url, &password);

        if let Some(value) = lookup("DELUGE_TIMEOUT_MS") {
            let millis = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                name: "DELUGE_TIMEOUT_MS",
                value: value.clone(),
            })?;
            config.timeout = Duration::from_millis(millis);
        }
        if let Some(value) = lookup("DELUGE_RELAX_TLS") {
            config.relax_tls = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "" | "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: "DELUGE_RELAX_TLS",
                        value,
                    })
                }
            };
        }
        Ok(config)
    }

    /// The JSON endpoint: the base URL with exactly one trailing `json`
    /// segment.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let base = trimmed.strip_suffix("/json").unwrap_or(trimmed);
        let endpoint = format!("{base}/json");
        Url::parse(&endpoint).map_err(|source| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })?;
        Ok(endpoint)
    }

    /// TLS relaxation only means something for `https` endpoints.
    pub fn relaxes_tls(&self) -> bool {
        self.relax_tls
            && Url::parse(self.base_url.trim()).is_ok_and(|url| url.scheme() == "https")
    }
}
