//! Configuration and secrets management

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::platform::Environment;

/// Name of the secret holding the HMAC signing key
pub const SECRET_NAME: &str = "SECRET";

/// Default sticker picker URL handed to the widget screen
pub const DEFAULT_STICKER_URL: &str = "https://example.com/?theme=$theme";

/// Default bound on identity provider lookups
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide symmetric key used to sign and verify scalar tokens
///
/// Never empty. The key bytes are not printed by `Debug`.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ApiError::internal("signing key must not be empty"));
        }
        Ok(Self(bytes))
    }

    /// Load the key from the `SECRET` environment secret
    pub fn from_env(env: &dyn Environment) -> Result<Self> {
        let secret = env
            .get_secret(SECRET_NAME)
            .map_err(|_| ApiError::internal(format!("{} environment variable is not set", SECRET_NAME)))?;

        Self::new(secret.into_bytes())
            .map_err(|_| ApiError::internal(format!("{} environment variable is empty", SECRET_NAME)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningKey").field(&"<redacted>").finish()
    }
}

/// Bridge configuration, built once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct Config {
    /// Key for signing and verifying scalar tokens
    pub signing_key: SigningKey,
    /// Only accept OpenID tokens from this homeserver (`None` accepts any)
    pub allowed_homeserver: Option<String>,
    /// URL the sticker picker widget points at
    pub sticker_url: String,
    /// Bound on each identity provider request
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            allowed_homeserver: None,
            sticker_url: DEFAULT_STICKER_URL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Restrict verification to a single homeserver; an empty name disables the restriction
    pub fn with_allowed_homeserver(mut self, homeserver: impl Into<String>) -> Self {
        let homeserver = homeserver.into();
        self.allowed_homeserver = if homeserver.is_empty() {
            None
        } else {
            Some(homeserver)
        };
        self
    }

    pub fn with_sticker_url(mut self, sticker_url: impl Into<String>) -> Self {
        self.sticker_url = sticker_url.into();
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}
