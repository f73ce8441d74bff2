//! Identity verification
//!
//! Confirms a Matrix OpenID access token with the homeserver that claims to
//! have issued it and returns the user it vouches for.

use tracing::{info, warn};

use crate::error::{ApiError, Result};
use crate::matrix;
use crate::platform::HttpClient;

/// An unverified claim: "this access token was issued by `provider_name`"
#[derive(Debug, Clone)]
pub struct IdentityAssertion {
    pub provider_name: String,
    pub access_token: String,
}

/// A provider-qualified Matrix user ID (`@user:server`) that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject(String);

impl VerifiedSubject {
    /// Only verification and token validation mint subjects.
    pub(crate) fn new(subject_id: impl Into<String>) -> Self {
        Self(subject_id.into())
    }

    pub fn subject_id(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Verify an OpenID access token against the homeserver named in the assertion
///
/// When `allowed_provider` is set, assertions naming any other homeserver are
/// refused before any network traffic happens. The returned user ID must live
/// on the asserting homeserver, so one server cannot vouch for another's users.
pub async fn verify(
    assertion: &IdentityAssertion,
    allowed_provider: Option<&str>,
    http: &dyn HttpClient,
) -> Result<VerifiedSubject> {
    let provider = assertion.provider_name.as_str();

    if assertion.access_token.is_empty() {
        return Err(ApiError::invalid_request("access_token cannot be empty"));
    }

    if provider.is_empty() {
        return Err(ApiError::invalid_request("matrix_server_name cannot be empty"));
    }

    if let Some(allowed) = allowed_provider.filter(|allowed| !allowed.is_empty()) {
        if provider != allowed {
            warn!(provider, allowed, "homeserver not allowed");
            return Err(ApiError::provider_not_allowed(provider));
        }
    }

    let endpoint = matrix::resolve_server(provider, http).await?;
    let subject = matrix::lookup_user_info(&endpoint, &assertion.access_token, http).await?;

    if !subject_belongs_to(&subject, provider) {
        warn!(provider, subject = %subject, "homeserver vouched for a foreign user");
        return Err(ApiError::subject_provider_mismatch(subject, provider));
    }

    info!(provider, subject = %subject, "verified OpenID token");
    Ok(VerifiedSubject::new(subject))
}

/// A user ID belongs to a server when its server part is exactly that server name
fn subject_belongs_to(subject: &str, provider: &str) -> bool {
    subject
        .strip_suffix(provider)
        .is_some_and(|localpart| localpart.len() > 1 && localpart.ends_with(':'))
}
