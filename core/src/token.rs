//! Scalar token issuance and validation
//!
//! Scalar tokens are HS256 JWTs carrying the verified Matrix user ID in a
//! `username` claim. There is no server-side record: a token stays valid for
//! as long as the signing key does.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SigningKey;
use crate::error::{ApiError, Result};
use crate::identity::VerifiedSubject;

/// Claim holding the subject's Matrix user ID
pub const USERNAME_CLAIM: &str = "username";

/// Algorithm used for every token this codec issues
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Header algorithms accepted on validation. Anything else, including
/// `none` and every asymmetric algorithm, is refused before the signature
/// is looked at.
const ALLOWED_ALGORITHMS: [(&str, Algorithm); 3] = [
    ("HS256", Algorithm::HS256),
    ("HS384", Algorithm::HS384),
    ("HS512", Algorithm::HS512),
];

#[derive(Serialize)]
struct IssuedClaims<'a> {
    username: &'a str,
}

/// Only `alg` is inspected before verification
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and validates scalar tokens with the process signing key
#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionTokenCodec {
    pub fn new(key: &SigningKey) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
        }
    }

    /// Mint a scalar token for a verified subject
    pub fn issue(&self, subject: &VerifiedSubject) -> Result<String> {
        let claims = IssuedClaims {
            username: subject.subject_id(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| ApiError::signing_failed(e.to_string()))
    }

    /// Check a presented scalar token and return the subject it was issued to
    pub fn validate(&self, token: &str) -> Result<VerifiedSubject> {
        let algorithm = check_header_algorithm(token).map_err(|e| {
            match &e {
                ApiError::AlgorithmMismatch { alg } => warn!(alg = %alg, "scalar token algorithm rejected"),
                _ => debug!(error = %e, "scalar token rejected"),
            }
            e
        })?;

        let mut validation = Validation::new(algorithm);
        validation.algorithms = ALLOWED_ALGORITHMS.iter().map(|(_, alg)| *alg).collect();
        // Issued tokens carry no registered claims; `exp` is still honoured when present.
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<serde_json::Map<String, serde_json::Value>>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!(error = %e, "scalar token rejected");
                map_decode_error(e.into_kind())
            })?;

        match data.claims.get(USERNAME_CLAIM) {
            Some(serde_json::Value::String(username)) => Ok(VerifiedSubject::new(username.clone())),
            _ => Err(ApiError::missing_claim(USERNAME_CLAIM)),
        }
    }
}

/// Parse the token header by hand and enforce the algorithm allow-list
fn check_header_algorithm(token: &str) -> Result<Algorithm> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut segments = token.split('.');
    let (header, _payload, _signature) = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), Some(signature), None) => (header, payload, signature),
        _ => return Err(ApiError::malformed_token("expected three dot-separated segments")),
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| ApiError::malformed_token(format!("invalid header encoding: {}", e)))?;

    let header: RawHeader = serde_json::from_slice(&header_json)
        .map_err(|e| ApiError::malformed_token(format!("invalid header: {}", e)))?;

    ALLOWED_ALGORITHMS
        .iter()
        .find(|(name, _)| *name == header.alg)
        .map(|(_, alg)| *alg)
        .ok_or_else(|| ApiError::algorithm_mismatch(header.alg))
}

fn map_decode_error(kind: ErrorKind) -> ApiError {
    match kind {
        ErrorKind::InvalidSignature => ApiError::invalid_signature("signature does not match"),
        ErrorKind::ExpiredSignature => ApiError::invalid_signature("token has expired"),
        ErrorKind::ImmatureSignature => ApiError::invalid_signature("token is not yet valid"),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            ApiError::algorithm_mismatch("algorithm not allowed")
        }
        other => ApiError::malformed_token(format!("{:?}", other)),
    }
}
