//! Account lookup: turns a scalar token back into the Matrix user ID

use serde::Serialize;

use crate::error::Result;
use crate::token::SessionTokenCodec;

/// Account response
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user_id: String,
}

/// Handle an account request for a presented scalar token
pub fn handle(scalar_token: &str, codec: &SessionTokenCodec) -> Result<AccountResponse> {
    let subject = codec.validate(scalar_token)?;

    Ok(AccountResponse {
        user_id: subject.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningKey;
    use crate::error::ApiError;
    use crate::identity::VerifiedSubject;

    #[test]
    fn test_account_returns_user_id() {
        let codec = SessionTokenCodec::new(&SigningKey::new("secret").unwrap());
        let token = codec.issue(&VerifiedSubject::new("@alice:example.org")).unwrap();

        let response = handle(&token, &codec).unwrap();
        assert_eq!(response.user_id, "@alice:example.org");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"user_id": "@alice:example.org"})
        );
    }

    #[test]
    fn test_account_invalid_token_is_unauthorized() {
        let codec = SessionTokenCodec::new(&SigningKey::new("secret").unwrap());

        let err = handle("", &codec).unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken { .. }));
        assert_eq!(err.status_code(), 401);
    }
}
