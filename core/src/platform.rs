//! Platform abstraction traits
//!
//! These traits define the boundary between the platform-agnostic bridge logic
//! and the process that hosts it (the hyper server, or mocks in tests).

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// HTTP client for outbound requests (well-known lookups, OpenID userinfo)
///
/// Implementations must bound every request with a timeout and report
/// transport failures (including timeouts) as errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// HTTP response from an outbound request
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Parse body as UTF-8 string
    pub fn text(&self) -> std::result::Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Parse body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Environment/secrets access
pub trait Environment {
    fn get_secret(&self, name: &str) -> Result<String>;
}
