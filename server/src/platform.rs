//! Process platform implementations
//!
//! Implements the core platform traits for a native server process:
//! - HttpClient: reqwest, with a per-request timeout
//! - Environment: std::env

use async_trait::async_trait;
use std::time::Duration;

use scalar_bridge_core::error::{ApiError, Result};
use scalar_bridge_core::platform::{Environment, HttpClient, HttpResponse};

const USER_AGENT: &str = concat!("scalar-bridge/", env!("CARGO_PKG_VERSION"));

/// Largest homeserver response body buffered
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// reqwest-based HTTP client
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut builder = self.client.get(url);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let mut response = builder.send().await.map_err(upstream_error)?;

        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
        {
            return Err(ApiError::verification_failed("homeserver response too large"));
        }

        let status = response.status().as_u16();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(upstream_error)? {
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(ApiError::verification_failed("homeserver response too large"));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse { status, body })
    }
}

fn upstream_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::verification_failed("homeserver request timed out")
    } else {
        ApiError::verification_failed(format!("HTTP GET failed: {}", e))
    }
}

/// Environment backed by the process environment variables
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get_secret(&self, name: &str) -> Result<String> {
        std::env::var(name)
            .map_err(|_| ApiError::internal(format!("environment variable '{}' not set", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one connection: read the request, wait `delay`, then write `response` and close
    async fn serve_once(response: Vec<u8>, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            // The client may hang up early once it has seen enough.
            let _ = stream.write_all(&response).await;
            let _ = stream.shutdown().await;
        });

        format!("http://{}/", addr)
    }

    fn client() -> ReqwestHttpClient {
        ReqwestHttpClient::new(Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_get_reads_small_body() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}".to_vec(),
            Duration::ZERO,
        )
        .await;

        let response = client().get(&url, &[]).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{}");
    }

    #[tokio::test]
    async fn test_get_rejects_oversized_content_length() {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            MAX_RESPONSE_BYTES + 1
        )
        .into_bytes();
        response.extend(std::iter::repeat(b'a').take(MAX_RESPONSE_BYTES + 1));
        let url = serve_once(response, Duration::ZERO).await;

        let err = client().get(&url, &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::VerificationFailed { .. }), "{:?}", err);
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_get_rejects_oversized_body_without_length() {
        let mut response = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec();
        response.extend(std::iter::repeat(b'a').take(4 * MAX_RESPONSE_BYTES));
        let url = serve_once(response, Duration::ZERO).await;

        let err = client().get(&url, &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::VerificationFailed { .. }), "{:?}", err);
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_get_timeout_is_verification_failure() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}".to_vec(),
            Duration::from_secs(3),
        )
        .await;

        let err = client().get(&url, &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::VerificationFailed { .. }), "{:?}", err);
        assert!(err.to_string().contains("timed out"));
    }
}
