//! Error types and HTTP status mapping

use serde::Serialize;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Coarse error taxonomy used to pick the response class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed request body or parameters
    Input,
    /// Provider not allowed, subject mismatch, or a rejected session token
    Authorization,
    /// Identity provider unreachable or rejected the access token
    Upstream,
    /// Local failure (signing, configuration)
    Internal,
}

/// API error with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("homeserver '{provider}' is not allowed")]
    ProviderNotAllowed { provider: String },

    #[error("homeserver '{provider}' does not match user '{subject}'")]
    SubjectProviderMismatch { subject: String, provider: String },

    #[error("verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("malformed token: {message}")]
    MalformedToken { message: String },

    #[error("unexpected signing method: {alg}")]
    AlgorithmMismatch { alg: String },

    #[error("invalid signature: {message}")]
    InvalidSignature { message: String },

    #[error("token is missing claim '{claim}'")]
    MissingClaim { claim: String },

    #[error("failed to sign token: {message}")]
    SigningFailed { message: String },

    #[error("unknown screen: {screen}")]
    UnknownScreen { screen: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn provider_not_allowed(provider: impl Into<String>) -> Self {
        Self::ProviderNotAllowed {
            provider: provider.into(),
        }
    }

    pub fn subject_provider_mismatch(subject: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::SubjectProviderMismatch {
            subject: subject.into(),
            provider: provider.into(),
        }
    }

    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            message: message.into(),
        }
    }

    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    pub fn algorithm_mismatch(alg: impl Into<String>) -> Self {
        Self::AlgorithmMismatch { alg: alg.into() }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim {
            claim: claim.into(),
        }
    }

    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::SigningFailed {
            message: message.into(),
        }
    }

    pub fn unknown_screen(screen: impl Into<String>) -> Self {
        Self::UnknownScreen {
            screen: screen.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Which part of the error taxonomy this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidRequest { .. } | Self::UnknownScreen { .. } => ErrorClass::Input,
            Self::ProviderNotAllowed { .. }
            | Self::SubjectProviderMismatch { .. }
            | Self::MalformedToken { .. }
            | Self::AlgorithmMismatch { .. }
            | Self::InvalidSignature { .. }
            | Self::MissingClaim { .. } => ErrorClass::Authorization,
            Self::VerificationFailed { .. } => ErrorClass::Upstream,
            Self::SigningFailed { .. } | Self::Internal { .. } => ErrorClass::Internal,
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// Upstream failures are reported as client faults: the caller has to
    /// obtain a fresh OpenID token from its homeserver and try again.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Input => 400,
            ErrorClass::Upstream => 400,
            ErrorClass::Authorization => 401,
            ErrorClass::Internal => 500,
        }
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::ProviderNotAllowed { .. } => "provider_not_allowed",
            Self::SubjectProviderMismatch { .. } => "subject_provider_mismatch",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::MalformedToken { .. } => "malformed_token",
            Self::AlgorithmMismatch { .. } => "algorithm_mismatch",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::MissingClaim { .. } => "missing_claim",
            Self::SigningFailed { .. } => "signing_failed",
            Self::UnknownScreen { .. } => "unknown_screen",
            Self::Internal { .. } => "internal_error",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.error_key().to_string(),
            message: err.to_string(),
        }
    }
}
