//! Registration: exchanges a Matrix OpenID token for a scalar token

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::identity::{self, IdentityAssertion};
use crate::platform::HttpClient;
use crate::token::SessionTokenCodec;

/// OpenID token as returned by the homeserver's `/openid/request_token`
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub access_token: String,
    pub matrix_server_name: String,
    /// Accepted for compatibility; not used
    #[serde(default)]
    pub token_type: Option<String>,
    /// Accepted for compatibility; not used
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl RegisterRequest {
    /// Parse a request body
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| ApiError::invalid_request(format!("invalid JSON: {}", e)))
    }
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub scalar_token: String,
}

/// Handle a registration request
pub async fn handle(
    request: RegisterRequest,
    config: &Config,
    codec: &SessionTokenCodec,
    http: &dyn HttpClient,
) -> Result<RegisterResponse> {
    let assertion = IdentityAssertion {
        provider_name: request.matrix_server_name,
        access_token: request.access_token,
    };

    let subject = identity::verify(&assertion, config.allowed_homeserver.as_deref(), http).await?;
    let scalar_token = codec.issue(&subject)?;

    Ok(RegisterResponse { scalar_token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningKey;
    use crate::scalar::account;
    use crate::test_support::{json_response, MockHttp};

    fn config() -> Config {
        Config::new(SigningKey::new("secret").unwrap())
    }

    fn homeserver_returning(sub: &str) -> MockHttp {
        MockHttp::new(vec![(
            "/_matrix/federation/v1/openid/userinfo".to_string(),
            json_response(200, serde_json::json!({ "sub": sub })),
        )])
    }

    #[test]
    fn test_parse_request() {
        let body = br#"{"access_token":"abc","expires_in":3600,"matrix_server_name":"example.org","token_type":"Bearer"}"#;
        let request = RegisterRequest::from_json(body).unwrap();

        assert_eq!(request.access_token, "abc");
        assert_eq!(request.matrix_server_name, "example.org");
        assert_eq!(request.token_type.as_deref(), Some("Bearer"));
        assert_eq!(request.expires_in, Some(3600));
    }

    #[test]
    fn test_parse_request_optional_fields() {
        let body = br#"{"access_token":"abc","matrix_server_name":"example.org"}"#;
        let request = RegisterRequest::from_json(body).unwrap();
        assert!(request.token_type.is_none());
        assert!(request.expires_in.is_none());
    }

    #[test]
    fn test_parse_request_invalid_json() {
        let err = RegisterRequest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest { .. }));
        assert_eq!(err.status_code(), 400);

        let err = RegisterRequest::from_json(br#"{"access_token":"abc"}"#).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_register_then_account_end_to_end() {
        let config = config();
        let codec = SessionTokenCodec::new(&config.signing_key);
        let http = homeserver_returning("@alice:example.org");

        let request = RegisterRequest {
            access_token: "opaque".to_string(),
            matrix_server_name: "example.org".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
        };

        let response = handle(request, &config, &codec, &http).await.unwrap();
        let account = account::handle(&response.scalar_token, &codec).unwrap();
        assert_eq!(account.user_id, "@alice:example.org");
    }

    #[tokio::test]
    async fn test_register_honours_allowed_homeserver() {
        let config = config().with_allowed_homeserver("example.org");
        let codec = SessionTokenCodec::new(&config.signing_key);
        let http = homeserver_returning("@alice:other.org");

        let request = RegisterRequest {
            access_token: "opaque".to_string(),
            matrix_server_name: "other.org".to_string(),
            token_type: None,
            expires_in: None,
        };

        let err = handle(request, &config, &codec, &http).await.unwrap_err();
        assert!(matches!(err, ApiError::ProviderNotAllowed { .. }));
        assert_eq!(err.status_code(), 401);
    }
}
