use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Polling max_attempts must be at least 1")]
    NoPollAttempts,

    #[error("Endpoint URL cannot carry a path: {0}")]
    NotABaseUrl(Url),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

/// Network listener configuration
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Base URLs of the identity provider and the Graph API.
///
/// Overridable so the service can target a national cloud or a local mock.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    /// Token endpoint is `{login_url}/{tenant_id}/oauth2/v2.0/token`.
    pub login_url: Url,
    /// Versioned Graph root, e.g. `https://graph.microsoft.com/v1.0`.
    pub graph_url: Url,
    /// Scope requested in the client-credentials exchange.
    pub scope: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            login_url: Url::parse("https://login.microsoftonline.com")
                .expect("static login url is valid"),
            graph_url: Url::parse("https://graph.microsoft.com/v1.0")
                .expect("static graph url is valid"),
            scope: "https://graph.microsoft.com/.default".into(),
        }
    }
}

/// How long to wait for an asynchronous copy to become searchable.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Polling {
    pub max_attempts: u32,
    /// Delay before every search attempt.
    pub interval_ms: u64,
}

impl Polling {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for Polling {
    fn default() -> Self {
        Polling {
            max_attempts: 10,
            interval_ms: 2000,
        }
    }
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub polling: Polling,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.polling.max_attempts == 0 {
            return Err(ValidationError::NoPollAttempts);
        }

        for url in [&self.endpoints.login_url, &self.endpoints.graph_url] {
            if url.cannot_be_a_base() {
                return Err(ValidationError::NotABaseUrl(url.clone()));
            }
        }

        Ok(())
    }
}

/// A value that must not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Identifiers and credentials read from the process environment at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Secret,
    /// Shared secret every inbound request has to present.
    pub api_secret: Secret,
    pub site_id: String,
    pub drive_id: String,
    /// Template workbook that gets copied for each request.
    pub source_file_id: String,
    pub worksheet_name: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or(SettingsError::Missing(key))
        };

        Ok(Settings {
            tenant_id: get("TENANT_ID")?,
            client_id: get("CLIENT_ID")?,
            client_secret: Secret::new(get("CLIENT_SECRET")?),
            api_secret: Secret::new(get("API_SECRET")?),
            site_id: get("SITE_ID")?,
            drive_id: get("DRIVE_ID")?,
            source_file_id: get("SOURCE_FILE_ID")?,
            worksheet_name: get("WORKSHEET_NAME")?,
        })
    }
}
