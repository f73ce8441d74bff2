//! Mock implementations of platform traits for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ApiError, Result};
use crate::platform::{Environment, HttpClient, HttpResponse};

/// Mock HTTP client with pre-configured responses, matched by URL substring
///
/// Requests without a matching pattern fail like an unreachable host would.
pub struct MockHttp {
    responses: Vec<(String, HttpResponse)>,
    requests: Mutex<Vec<String>>,
}

impl MockHttp {
    pub fn new(responses: Vec<(String, HttpResponse)>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// URLs requested so far, in order
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        for (pattern, response) in &self.responses {
            if url.contains(pattern) {
                return Ok(HttpResponse {
                    status: response.status,
                    body: response.body.clone(),
                });
            }
        }
        Err(ApiError::verification_failed(format!("no mock response for GET {}", url)))
    }
}

/// Build a canned JSON response
pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string().into_bytes(),
    }
}

/// Mock environment backed by an in-memory HashMap
pub struct MockEnv {
    secrets: HashMap<String, String>,
}

impl MockEnv {
    pub fn empty() -> Self {
        Self {
            secrets: HashMap::new(),
        }
    }

    pub fn with_secret(name: &str, value: &str) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(name.to_string(), value.to_string());
        Self { secrets }
    }
}

impl Environment for MockEnv {
    fn get_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::internal(format!("secret '{}' not found", name)))
    }
}
