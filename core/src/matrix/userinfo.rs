//! OpenID userinfo exchange
//!
//! Asks a homeserver which user an OpenID access token was issued to.

use serde::Deserialize;
use url::Url;

use super::discovery::FederationEndpoint;
use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

const USERINFO_PATH: &str = "/_matrix/federation/v1/openid/userinfo";

#[derive(Deserialize)]
struct UserInfoResponse {
    sub: String,
}

/// Matrix standard error body
#[derive(Deserialize)]
struct MatrixError {
    errcode: String,
    #[serde(default)]
    error: Option<String>,
}

/// Exchange an OpenID access token for the Matrix user ID it belongs to
///
/// Every failure (transport, non-200 status, unexpected body) is reported as
/// `VerificationFailed`; nothing is retried.
pub async fn lookup_user_info(
    endpoint: &FederationEndpoint,
    access_token: &str,
    http: &dyn HttpClient,
) -> Result<String> {
    let mut url = Url::parse(&endpoint.base_url)
        .and_then(|base| base.join(USERINFO_PATH))
        .map_err(|e| ApiError::verification_failed(format!("invalid federation endpoint: {}", e)))?;
    url.query_pairs_mut().append_pair("access_token", access_token);

    let response = http
        .get(url.as_str(), &[("Accept", "application/json")])
        .await
        .map_err(|e| ApiError::verification_failed(format!("failed to reach homeserver: {}", e)))?;

    if response.status != 200 {
        let detail = match response.json::<MatrixError>() {
            Ok(err) => match err.error {
                Some(message) => format!("{}: {}", err.errcode, message),
                None => err.errcode,
            },
            Err(_) => response.text().unwrap_or_default(),
        };
        return Err(ApiError::verification_failed(format!(
            "homeserver rejected token (HTTP {}): {}",
            response.status, detail
        )));
    }

    let info: UserInfoResponse = response
        .json()
        .map_err(|e| ApiError::verification_failed(format!("invalid userinfo response: {}", e)))?;

    Ok(info.sub)
}
