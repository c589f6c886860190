use chrono::{Duration, Utc};
use std::{env, fmt};

use crate::errors::RegistryError;

pub const DEFAULT_COOKIE_NAME: &str = "__Host-SessionId";
pub const DEFAULT_TTL_SECONDS: i64 = 600; // 10 minutes

/// Fixed settings of a [`SessionRegistry`](crate::SessionRegistry).
///
/// A config is never mutated after the registry is built from it.
#[derive(Clone)]
pub struct RegistryConfig {
    /// Name of the cookie that carries the session token
    pub cookie_name: String,
    /// Key material mixed into every generated token
    pub secret: String,
    /// Lifetime of a new session, counted from its creation
    pub ttl: Duration,
}

impl RegistryConfig {
    pub fn new(cookie_name: impl Into<String>, secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secret: secret.into(),
            ttl,
        }
    }

    /// Build a config from process environment variables
    ///
    /// * `SESSION_COOKIE_NAME` - defaults to `__Host-SessionId`
    /// * `SESSION_SECRET` - required
    /// * `SESSION_TTL_SECONDS` - session lifetime in seconds (not minutes), defaults to 600;
    ///   unparsable or out-of-range values fall back to the default
    ///
    /// The returned config has already passed [`RegistryConfig::validate`].
    pub fn from_env() -> Result<Self, RegistryError> {
        let cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string());

        let secret = env::var("SESSION_SECRET")
            .map_err(|_| RegistryError::InvalidConfig("SESSION_SECRET must be set".to_string()))?;

        let ttl = env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::seconds(DEFAULT_TTL_SECONDS));

        let config = Self::new(cookie_name, secret, ttl);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would yield guessable tokens or sessions that are dead on arrival.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.cookie_name.is_empty() {
            return Err(RegistryError::InvalidConfig(
                "cookie name must not be empty".to_string(),
            ));
        }
        if self.secret.is_empty() {
            return Err(RegistryError::InvalidConfig(
                "secret must not be empty".to_string(),
            ));
        }
        if self.ttl <= Duration::zero() {
            return Err(RegistryError::InvalidConfig(format!(
                "ttl must be positive, got {}s",
                self.ttl.num_seconds()
            )));
        }
        if Utc::now().checked_add_signed(self.ttl).is_none() {
            return Err(RegistryError::InvalidConfig(format!(
                "ttl of {}s puts the expiry out of range",
                self.ttl.num_seconds()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("cookie_name", &self.cookie_name)
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}
