//! Authentication Error Handling (SI-11)
//!
//! NIST SP 800-53 SI-11 compliant error taxonomy for the authentication
//! core. Every variant is an expected, recoverable condition surfaced to the
//! boundary layer as a typed failure; only genuine infrastructure faults
//! (hashing primitive failure, token signing failure, store outage) map to
//! a generic 500.
//!
//! # Anti-Enumeration
//!
//! "User not found" and "wrong password" both surface as
//! [`AuthError::InvalidCredentials`] with a single shared message, so a
//! caller cannot learn which check failed. Internal detail goes to the
//! audit log, never into the response body.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// The one user-visible message for every credential-related failure.
pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid email or password, or the account is blocked";

/// Authentication failure taxonomy.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The hashing primitive failed while creating a hash. Verification-side
    /// failures never surface here; they degrade to a non-match.
    #[error("credential hashing failed: {0}")]
    Hashing(String),

    /// Identity unknown or secret mismatch. Deliberately indistinguishable
    /// from each other at the boundary.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Identity exists and the secret may be correct, but the account is
    /// administratively deactivated.
    #[error("account is blocked")]
    AccountBlocked,

    /// Rate limit triggered for this identity.
    #[error("too many attempts, retry after {} seconds", retry_after.as_secs())]
    TooManyAttempts {
        /// How long the caller must wait before the next attempt.
        retry_after: Duration,
    },

    /// Signature, structure, or expiry check failed during token
    /// verification or refresh. Always "treat as unauthenticated",
    /// never fatal.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Token signing failed. Like [`AuthError::Hashing`], an infrastructure
    /// fault rather than an authentication decision.
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The user store could not be reached or answered with an error.
    #[error("user store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl AuthError {
    /// HTTP status this error maps to at the boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::AccountBlocked | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Hashing(_) | Self::Signing(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable error code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountBlocked => "account_blocked",
            Self::TooManyAttempts { .. } => "too_many_attempts",
            Self::InvalidToken => "invalid_token",
            Self::Hashing(_) | Self::Signing(_) | Self::Store(_) => "internal_error",
        }
    }

    fn log(&self) {
        match self {
            Self::Hashing(_) | Self::Signing(_) | Self::Store(_) => {
                tracing::error!(error = %self, code = self.code(), "Authentication infrastructure fault");
            }
            Self::TooManyAttempts { retry_after } => {
                tracing::warn!(
                    code = self.code(),
                    retry_after_secs = retry_after.as_secs(),
                    "Authentication rate limited"
                );
            }
            _ => {
                tracing::debug!(code = self.code(), "Authentication rejected");
            }
        }
    }
}

/// JSON error response shape consumed by HTTP clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        match self {
            Self::InvalidCredentials => unauthorized_response(
                self.code(),
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                "Bearer",
            ),
            Self::AccountBlocked => unauthorized_response(
                self.code(),
                "Account is deactivated".to_string(),
                "Bearer",
            ),
            Self::InvalidToken => unauthorized_response(
                self.code(),
                "Could not validate credentials".to_string(),
                "Bearer error=\"invalid_token\"",
            ),
            Self::TooManyAttempts { retry_after } => {
                let secs = retry_after.as_secs();
                let body = ErrorBody {
                    error: "too_many_attempts",
                    message: format!("Too many attempts. Try again in {} seconds", secs),
                    retry_after: Some(secs),
                };
                (
                    status,
                    [(header::RETRY_AFTER, secs.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            // Infrastructure faults: generic message, detail stays in the log
            Self::Hashing(_) | Self::Signing(_) | Self::Store(_) => {
                let body = ErrorBody {
                    error: "internal_error",
                    message: "An internal error occurred".to_string(),
                    retry_after: None,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

fn unauthorized_response(code: &'static str, message: String, challenge: &'static str) -> Response {
    let body = ErrorBody {
        error: code,
        message,
        retry_after: None,
    };
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, challenge)],
        Json(body),
    )
        .into_response()
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AccountBlocked.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::TooManyAttempts { retry_after: Duration::from_secs(900) }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::Hashing("out of memory".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retry_after_in_message() {
        let err = AuthError::TooManyAttempts { retry_after: Duration::from_secs(900) };
        assert!(err.to_string().contains("900"));
    }

    #[test]
    fn test_credential_errors_share_code_and_status() {
        // Unknown identity and wrong password are produced as the same
        // variant; the boundary cannot tell them apart.
        let a = AuthError::InvalidCredentials;
        let b = AuthError::InvalidCredentials;
        assert_eq!(a.code(), b.code());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_internal_faults_use_generic_code() {
        assert_eq!(AuthError::Hashing("boom".into()).code(), "internal_error");
        assert_eq!(
            AuthError::Store(crate::store::StoreError("down".into())).code(),
            "internal_error"
        );
    }

    #[tokio::test]
    async fn test_too_many_attempts_response_headers() {
        let err = AuthError::TooManyAttempts { retry_after: Duration::from_secs(60) };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }

    #[tokio::test]
    async fn test_unauthorized_response_challenge() {
        let response = AuthError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers().get(header::WWW_AUTHENTICATE).unwrap();
        assert!(challenge.to_str().unwrap().starts_with("Bearer"));
    }
}
