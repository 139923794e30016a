//! Token Issuance and Verification (IA-5, SC-12)
//!
//! Stateless JWT access and refresh tokens. A token's lifecycle is
//! `issued → valid → expired`; there is no revoked state and no server-side
//! session store, trading revocability for horizontal scalability.
//!
//! # Token Classes
//!
//! Access tokens are short-lived (minutes, configurable) and authorize API
//! calls. Refresh tokens are long-lived (fixed 30 days) and exist solely to
//! mint new access tokens. Both classes sign with the same process-wide
//! secret; a `type: "refresh"` claim separates them, so a refresh token is
//! rejected where an access token is expected and an access token can never
//! refresh itself. One secret plus a type claim keeps key management simple
//! while still preventing privilege confusion between the classes.
//!
//! # Verification
//!
//! [`TokenService::verify`] checks signature and expiry atomically and
//! returns `None` on any failure: signature mismatch, malformed payload,
//! or expiry. Callers treat `None` as "unauthenticated", never as a crash.
//! Expiry is checked with zero leeway.

use std::fmt;

use chrono::{Duration as TokenTtl, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::events::SecurityEvent;

/// Refresh token lifetime. Fixed rather than configurable: the refresh
/// horizon is a product decision, not a deployment knob.
pub const REFRESH_TTL_DAYS: i64 = 30;

// ============================================================================
// Claims
// ============================================================================

/// Token class discriminator carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Long-lived token used solely to mint new access tokens
    Refresh,
}

/// Claim set embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's login identity (email)
    pub sub: String,
    /// Absolute expiry as a Unix timestamp; always set at creation
    pub exp: i64,
    /// Present (as `"refresh"`) only on refresh tokens
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKind>,
}

impl Claims {
    /// Whether this claim set belongs to a refresh token.
    pub fn is_refresh(&self) -> bool {
        matches!(self.kind, Some(TokenKind::Refresh))
    }
}

/// Serialized token pair handed to HTTP clients after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer credential for API calls
    pub access_token: String,
    /// Long-lived credential for minting new access tokens
    pub refresh_token: String,
    /// Always `"bearer"`
    pub token_type: String,
}

impl TokenPair {
    /// Assemble a pair with the standard bearer marker.
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

// ============================================================================
// Token Service
// ============================================================================

/// Issues and verifies signed, time-bounded tokens.
///
/// Pure with respect to shared state: the keys are derived once at
/// construction and never change (no key rotation), so the service needs no
/// locking and is freely `Clone`d across request handlers.
#[derive(Clone)]
pub struct TokenService {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: TokenTtl,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.header.alg)
            .field("access_ttl", &self.access_ttl)
            .finish()
    }
}

impl TokenService {
    /// Build a token service from the process configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        // A token with ttl T must fail strictly after now + T.
        validation.leeway = 0;

        let access_ttl = TokenTtl::from_std(config.access_token_ttl)
            .unwrap_or_else(|_| TokenTtl::minutes(15));

        Self {
            header: Header::new(config.algorithm),
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            validation,
            access_ttl,
        }
    }

    /// Issue an access token for `subject`, expiring after `ttl` (the
    /// configured default when `None`).
    pub fn issue_access(&self, subject: &str, ttl: Option<TokenTtl>) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or(self.access_ttl);
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
            kind: None,
        };

        let token = encode(&self.header, &claims, &self.encoding_key)?;
        crate::security_event!(
            SecurityEvent::TokenIssued,
            subject = %subject,
            ttl_secs = ttl.num_seconds(),
            "Access token issued"
        );
        Ok(token)
    }

    /// Issue a refresh token for `subject` with the fixed 30-day lifetime.
    pub fn issue_refresh(&self, subject: &str) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + TokenTtl::days(REFRESH_TTL_DAYS)).timestamp(),
            kind: Some(TokenKind::Refresh),
        };

        let token = encode(&self.header, &claims, &self.encoding_key)?;
        crate::security_event!(
            SecurityEvent::TokenIssued,
            subject = %subject,
            token_kind = "refresh",
            "Refresh token issued"
        );
        Ok(token)
    }

    /// Issue an access + refresh pair for `subject`.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let access = self.issue_access(subject, None)?;
        let refresh = self.issue_refresh(subject)?;
        Ok(TokenPair::new(access, refresh))
    }

    /// Decode and check a token's signature and expiry atomically.
    ///
    /// Returns the claims on success, `None` on any signature mismatch,
    /// malformed payload, or expiry violation.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(error) => {
                crate::security_event!(
                    SecurityEvent::TokenRejected,
                    reason = %error,
                    "Token failed verification"
                );
                None
            }
        }
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The presented token must be validly signed and unexpired, carry the
    /// `type: "refresh"` claim, and name a non-empty subject. Anything else,
    /// including a valid *access* token, yields `None`: no token can
    /// extend its own class.
    pub fn refresh(&self, refresh_token: &str) -> Option<String> {
        let claims = self.verify(refresh_token)?;

        if !claims.is_refresh() || claims.sub.is_empty() {
            crate::security_event!(
                SecurityEvent::TokenRejected,
                subject = %claims.sub,
                reason = "not_a_refresh_token",
                "Refresh rejected"
            );
            return None;
        }

        let access = self.issue_access(&claims.sub, None).ok()?;
        crate::security_event!(
            SecurityEvent::TokenRefreshed,
            subject = %claims.sub,
            "Access token refreshed"
        );
        Some(access)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        let config = AuthConfig::builder()
            .secret_key("unit-test-signing-key-0123456789abcdef")
            .build()
            .unwrap();
        TokenService::new(&config)
    }

    /// Corrupt the signature segment of a JWT.
    fn tamper(token: &str) -> String {
        let mut s = token.to_string();
        let last = s.pop().unwrap();
        s.push(if last == 'A' { 'B' } else { 'A' });
        s
    }

    #[test]
    fn test_access_token_round_trip() {
        let svc = service();
        let token = svc.issue_access("u@x.com", None).unwrap();

        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "u@x.com");
        assert!(!claims.is_refresh());
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let token = svc.issue_access("u@x.com", Some(TokenTtl::seconds(-30))).unwrap();
        assert!(svc.verify(&token).is_none());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let token = svc.issue_access("u@x.com", None).unwrap();
        assert!(svc.verify(&tamper(&token)).is_none());
    }

    #[test]
    fn test_malformed_token_rejected() {
        let svc = service();
        assert!(svc.verify("not.a.jwt").is_none());
        assert!(svc.verify("").is_none());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = service().issue_access("u@x.com", None).unwrap();

        let other = TokenService::new(
            &AuthConfig::builder()
                .secret_key("a-completely-different-key-9876543210")
                .build()
                .unwrap(),
        );
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn test_refresh_token_carries_type_claim() {
        let svc = service();
        let token = svc.issue_refresh("u@x.com").unwrap();

        let claims = svc.verify(&token).unwrap();
        assert!(claims.is_refresh());

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json.get("type").unwrap(), "refresh");
    }

    #[test]
    fn test_refresh_mints_access_for_same_subject() {
        let svc = service();
        let refresh = svc.issue_refresh("u@x.com").unwrap();

        let access = svc.refresh(&refresh).unwrap();
        let claims = svc.verify(&access).unwrap();
        assert_eq!(claims.sub, "u@x.com");
        assert!(!claims.is_refresh());
    }

    #[test]
    fn test_access_token_cannot_refresh() {
        // Type confusion: a valid access token must not mint new tokens.
        let svc = service();
        let access = svc.issue_access("u@x.com", None).unwrap();
        assert!(svc.refresh(&access).is_none());
    }

    #[test]
    fn test_empty_subject_refresh_rejected() {
        let svc = service();
        let refresh = svc.issue_refresh("").unwrap();
        assert!(svc.refresh(&refresh).is_none());
    }

    #[test]
    fn test_expired_refresh_rejected() {
        let svc = service();
        // Hand-roll an already-expired refresh token.
        let claims = Claims {
            sub: "u@x.com".to_string(),
            exp: Utc::now().timestamp() - 60,
            kind: Some(TokenKind::Refresh),
        };
        let token = encode(&svc.header, &claims, &svc.encoding_key).unwrap();
        assert!(svc.refresh(&token).is_none());
    }

    #[test]
    fn test_token_pair_shape() {
        let svc = service();
        let pair = svc.issue_pair("u@x.com").unwrap();
        assert_eq!(pair.token_type, "bearer");

        let json = serde_json::to_value(&pair).unwrap();
        assert!(json.get("access_token").is_some());
        assert!(json.get("refresh_token").is_some());
        assert_eq!(json.get("token_type").unwrap(), "bearer");
    }

    #[test]
    fn test_access_claims_omit_type() {
        let svc = service();
        let token = svc.issue_access("u@x.com", None).unwrap();
        let claims = svc.verify(&token).unwrap();

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("type").is_none());
    }
}
