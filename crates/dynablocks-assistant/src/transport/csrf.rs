//! CSRF token handling.
//!
//! The token accompanies every assistant request. It is wrapped in a
//! [`SecretString`] so it never shows up in `Debug` or `Display` output and
//! must be exposed explicitly at the point of use.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

/// Header carrying the token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Environment variable consulted when no token is configured.
pub const CSRF_TOKEN_ENV: &str = "DYNABLOCKS_CSRF_TOKEN";

/// Where a token was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Loaded from configuration JSON
    Config,
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
    /// No token found; requests carry an empty one
    Missing,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Config => write!(f, "config"),
            TokenSource::Environment => write!(f, "environment"),
            TokenSource::Programmatic => write!(f, "programmatic"),
            TokenSource::Missing => write!(f, "missing"),
        }
    }
}

/// A securely-stored CSRF token.
pub struct CsrfToken {
    value: SecretString,
    source: TokenSource,
}

impl CsrfToken {
    pub fn new(value: impl Into<String>, source: TokenSource) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
        }
    }

    /// An empty token, sent when the page has none.
    pub fn missing() -> Self {
        Self::new(String::new(), TokenSource::Missing)
    }

    /// Load from [`CSRF_TOKEN_ENV`], or an empty token if unset.
    pub fn from_env() -> Self {
        std::env::var(CSRF_TOKEN_ENV)
            .map(|v| Self::new(v, TokenSource::Environment))
            .unwrap_or_else(|_| Self::missing())
    }

    /// Load from `config[config_key]`, falling back to the environment.
    pub fn from_config_or_env(config: &JsonValue, config_key: &str) -> Self {
        match config[config_key].as_str() {
            Some(value) => Self::new(value, TokenSource::Config),
            None => Self::from_env(),
        }
    }

    /// Expose the token for use in a request header.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> TokenSource {
        self.source
    }
}

impl Clone for CsrfToken {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.source)
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfToken")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSRF token from {} [REDACTED]", self.source)
    }
}
