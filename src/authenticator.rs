//! Authentication Orchestration (IA-2)
//!
//! Composes the rate limiter, credential hasher, and token service into the
//! end-to-end login path:
//!
//! ```text
//! login request ──▶ rate limiter check ──▶ user lookup ──▶ credential
//! verify ──▶ token pair        (failures feed back into the rate limiter)
//! ```
//!
//! # Anti-Enumeration
//!
//! "User not found" and "wrong password" produce the identical
//! [`AuthError::InvalidCredentials`] value, so the boundary cannot reveal
//! which check failed. The distinction exists only in the audit log.

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::credential::CredentialHasher;
use crate::error::AuthError;
use crate::events::SecurityEvent;
use crate::rate_limit::LoginRateLimiter;
use crate::store::{User, UserStore};
use crate::token::{TokenPair, TokenService};

/// End-to-end authenticator over a pluggable user store.
///
/// Cheap to `Clone`; clones share the rate limiter state and signing keys.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
    limiter: LoginRateLimiter,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("tokens", &self.tokens)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl Authenticator {
    /// Build an authenticator from the process configuration.
    pub fn new(config: &AuthConfig, store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            hasher: CredentialHasher::new(),
            tokens: TokenService::new(config),
            limiter: LoginRateLimiter::new(config.lockout.clone()),
        }
    }

    /// Build from explicit parts (tests, custom clocks).
    pub fn with_parts(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        tokens: TokenService,
        limiter: LoginRateLimiter,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            limiter,
        }
    }

    /// The token service, for hosts issuing or verifying tokens directly.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// The rate limiter, for administrative resets.
    pub fn rate_limiter(&self) -> &LoginRateLimiter {
        &self.limiter
    }

    /// The credential hasher, for the registration layer to hash new
    /// passwords and secret words with the same parameters.
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Authenticate a login request end-to-end.
    ///
    /// Applies the rate limiter (including its progressive delay), resolves
    /// the user, verifies the password, and keeps the limiter's books. The
    /// caller receives either the user record or a typed failure ready for
    /// the boundary layer.
    pub async fn authenticate(&self, identity: &str, secret: &str) -> Result<User, AuthError> {
        self.limiter.check(identity).await?;

        let user = match self.store.find_by_email(identity).await? {
            Some(user) => user,
            None => {
                crate::security_event!(
                    SecurityEvent::AuthenticationFailure,
                    identity = %identity,
                    reason = "unknown_identity",
                    "Authentication failed"
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.is_active {
            crate::security_event!(
                SecurityEvent::AuthenticationFailure,
                identity = %identity,
                reason = "account_deactivated",
                "Authentication failed"
            );
            return Err(AuthError::AccountBlocked);
        }

        if !self.hasher.verify(secret, &user.password_hash) {
            self.limiter.record_failure(identity);
            crate::security_event!(
                SecurityEvent::AuthenticationFailure,
                identity = %identity,
                reason = "invalid_password",
                "Authentication failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        self.limiter.record_success(identity);
        crate::security_event!(
            SecurityEvent::AuthenticationSuccess,
            identity = %identity,
            user_id = user.id,
            "User authenticated"
        );
        Ok(user)
    }

    /// Authenticate and mint the access/refresh token pair handed to HTTP
    /// clients.
    pub async fn login(&self, identity: &str, secret: &str) -> Result<TokenPair, AuthError> {
        let user = self.authenticate(identity, secret).await?;
        self.tokens.issue_pair(&user.email)
    }

    /// Rotate a refresh token into a fresh access/refresh pair.
    ///
    /// Token-level checks only (signature, expiry, `type: "refresh"`,
    /// non-empty subject); deactivating an account does not invalidate
    /// already-issued refresh tokens; there is no revocation list.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .ok_or(AuthError::InvalidToken)?;

        if !claims.is_refresh() || claims.sub.is_empty() {
            crate::security_event!(
                SecurityEvent::TokenRejected,
                subject = %claims.sub,
                reason = "not_a_refresh_token",
                "Refresh rejected"
            );
            return Err(AuthError::InvalidToken);
        }

        let pair = self.tokens.issue_pair(&claims.sub)?;
        crate::security_event!(
            SecurityEvent::TokenRefreshed,
            subject = %claims.sub,
            "Token pair rotated"
        );
        Ok(pair)
    }

    /// Resolve the caller identity from a presented access token.
    ///
    /// Used by the routing layer on every authenticated request. Refresh
    /// tokens are rejected here: the type claim keeps the two token classes
    /// from standing in for each other.
    pub async fn identify(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self
            .tokens
            .verify(access_token)
            .ok_or(AuthError::InvalidToken)?;

        if claims.is_refresh() {
            crate::security_event!(
                SecurityEvent::TokenRejected,
                subject = %claims.sub,
                reason = "refresh_token_as_access",
                "Refresh token presented as access token"
            );
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .store
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::AccountBlocked);
        }

        Ok(user)
    }

    /// Reset a forgotten password via the secret-word challenge.
    ///
    /// The secret word is verified with the same hasher as the password (a
    /// deliberate reuse, see DESIGN.md). On success the new password hash
    /// is written through the store; the caller never sees either hash.
    pub async fn reset_password(
        &self,
        identity: &str,
        secret_word: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_email(identity)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(secret_word, &user.secret_word_hash) {
            crate::security_event!(
                SecurityEvent::AuthenticationFailure,
                identity = %identity,
                reason = "invalid_secret_word",
                "Password reset rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.hasher.hash(new_password)?;
        self.store.set_password_hash(identity, &new_hash).await?;

        crate::security_event!(
            SecurityEvent::PasswordReset,
            identity = %identity,
            "Password reset via secret word"
        );
        Ok(())
    }

    /// Change a password for an authenticated user.
    ///
    /// Requires the current password even though the caller already holds a
    /// valid access token, so a stolen token alone cannot take over the
    /// account.
    pub async fn change_password(
        &self,
        identity: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_email(identity)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(current_password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.hasher.hash(new_password)?;
        self.store.set_password_hash(identity, &new_hash).await?;

        crate::security_event!(
            SecurityEvent::PasswordChanged,
            identity = %identity,
            "Password changed"
        );
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::LockoutPolicy;
    use crate::store::{InMemoryUserStore, Role};
    use std::time::Duration;

    fn test_config() -> AuthConfig {
        AuthConfig::builder()
            .secret_key("orchestrator-test-key-0123456789abcdef")
            .lockout(LockoutPolicy::builder().progressive_delay_base(0).build())
            .build()
            .unwrap()
    }

    fn seed_user(store: &InMemoryUserStore, hasher: &CredentialHasher, active: bool) {
        store.insert(User {
            id: 1,
            email: "a@x.com".to_string(),
            password_hash: hasher.hash("p1").unwrap(),
            secret_word_hash: hasher.hash("magic").unwrap(),
            role: Role::User,
            is_active: active,
        });
    }

    fn setup() -> Authenticator {
        setup_with_active(true)
    }

    fn setup_with_active(active: bool) -> Authenticator {
        let store = Arc::new(InMemoryUserStore::new());
        let auth = Authenticator::new(&test_config(), store.clone());
        seed_user(&store, auth.hasher(), active);
        auth
    }

    #[tokio::test]
    async fn test_login_returns_verifiable_pair() {
        let auth = setup();
        let pair = auth.login("a@x.com", "p1").await.unwrap();

        assert_eq!(pair.token_type, "bearer");
        let claims = auth.tokens().verify(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "a@x.com");
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_indistinguishable() {
        let auth = setup();

        let unknown = auth.authenticate("ghost@x.com", "p1").await.unwrap_err();
        let mismatch = auth.authenticate("a@x.com", "wrong").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(mismatch, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), mismatch.to_string());
        assert_eq!(unknown.code(), mismatch.code());
    }

    #[tokio::test]
    async fn test_inactive_account_blocked() {
        let auth = setup_with_active(false);
        let err = auth.authenticate("a@x.com", "p1").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountBlocked));
    }

    #[tokio::test]
    async fn test_sixth_attempt_rate_limited() {
        let auth = setup();

        // Five wrong-password attempts, each passing the limiter check.
        for _ in 0..5 {
            let err = auth.authenticate("a@x.com", "wrong").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        // The sixth is rejected by the limiter before touching credentials.
        match auth.authenticate("a@x.com", "wrong").await.unwrap_err() {
            AuthError::TooManyAttempts { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(900));
            }
            other => panic!("expected TooManyAttempts, got {other:?}"),
        }

        // Even the correct password is rejected while blocked.
        assert!(matches!(
            auth.authenticate("a@x.com", "p1").await.unwrap_err(),
            AuthError::TooManyAttempts { .. }
        ));
    }

    #[tokio::test]
    async fn test_success_resets_attempt_tracking() {
        let auth = setup();

        for _ in 0..2 {
            let _ = auth.authenticate("a@x.com", "wrong").await;
        }
        assert_eq!(auth.rate_limiter().attempt_count("a@x.com"), 2);

        auth.authenticate("a@x.com", "p1").await.unwrap();
        assert_eq!(auth.rate_limiter().attempt_count("a@x.com"), 0);
        assert!(auth.rate_limiter().check("a@x.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_identity_not_counted_against_limiter() {
        let auth = setup();
        for _ in 0..3 {
            let _ = auth.authenticate("ghost@x.com", "p1").await;
        }
        assert_eq!(auth.rate_limiter().attempt_count("ghost@x.com"), 0);
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let auth = setup();
        let pair = auth.login("a@x.com", "p1").await.unwrap();

        let rotated = auth.refresh(&pair.refresh_token).unwrap();
        let user = auth.identify(&rotated.access_token).await.unwrap();
        assert_eq!(user.email, "a@x.com");

        // The rotated refresh token is itself usable.
        assert!(auth.refresh(&rotated.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let auth = setup();
        let pair = auth.login("a@x.com", "p1").await.unwrap();

        assert!(matches!(
            auth.refresh(&pair.access_token).unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_identify_rejects_refresh_token() {
        let auth = setup();
        let pair = auth.login("a@x.com", "p1").await.unwrap();

        assert!(matches!(
            auth.identify(&pair.refresh_token).await.unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_identify_unknown_subject() {
        let auth = setup();
        let token = auth.tokens().issue_access("ghost@x.com", None).unwrap();

        assert!(matches!(
            auth.identify(&token).await.unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_identify_inactive_user() {
        let auth = setup_with_active(false);
        let token = auth.tokens().issue_access("a@x.com", None).unwrap();

        assert!(matches!(
            auth.identify(&token).await.unwrap_err(),
            AuthError::AccountBlocked
        ));
    }

    #[tokio::test]
    async fn test_reset_password_with_secret_word() {
        let auth = setup();

        auth.reset_password("a@x.com", "magic", "p2").await.unwrap();

        assert!(auth.authenticate("a@x.com", "p2").await.is_ok());
        assert!(matches!(
            auth.authenticate("a@x.com", "p1").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_reset_password_wrong_secret_word() {
        let auth = setup();

        let err = auth
            .reset_password("a@x.com", "not-magic", "p2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Old password still works.
        assert!(auth.authenticate("a@x.com", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password() {
        let auth = setup();

        auth.change_password("a@x.com", "p1", "p2").await.unwrap();
        assert!(auth.authenticate("a@x.com", "p2").await.is_ok());

        // Wrong current password is rejected and changes nothing.
        assert!(matches!(
            auth.change_password("a@x.com", "p1", "p3").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(auth.authenticate("a@x.com", "p2").await.is_ok());
    }
}
