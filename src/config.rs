//! Authentication Configuration
//!
//! Runtime configuration for the authentication core, read once at process
//! start. There is no hot reload: token verification must agree on one
//! signing key and algorithm for the process lifetime.
//!
//! # Environment Variables
//!
//! - `SECRET_KEY`: JWT signing secret (required; validated against the
//!   strength policy for the current environment)
//! - `ALGORITHM`: "HS256", "HS384" or "HS512" (default: "HS256")
//! - `ACCESS_TOKEN_EXPIRE_MINUTES`: access token TTL (default: 15)
//! - `MAX_LOGIN_ATTEMPTS`: failures before lockout (default: 5)
//! - `LOGIN_ATTEMPT_WINDOW_SECONDS`: sliding window (default: 300)
//! - `LOGIN_BLOCK_DURATION_SECONDS`: lockout duration (default: 900)
//! - `APP_ENV` / `RUST_ENV`: selects the secret strength policy
//!   (default: "development")

use std::fmt;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::rate_limit::LockoutPolicy;
use crate::secret::{SigningSecretError, SigningSecretPolicy};

/// Default access-token lifetime when unconfigured.
pub const DEFAULT_ACCESS_TTL_MINUTES: u64 = 15;

/// Configuration errors surfaced at startup.
#[derive(Debug)]
pub enum ConfigError {
    /// `SECRET_KEY` is not set or empty
    MissingSecret,
    /// The signing secret failed the strength policy
    WeakSecret(SigningSecretError),
    /// `ALGORITHM` names something outside the HMAC family
    UnsupportedAlgorithm(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret => write!(f, "SECRET_KEY must be set"),
            Self::WeakSecret(e) => write!(f, "SECRET_KEY rejected: {}", e),
            Self::UnsupportedAlgorithm(s) => {
                write!(f, "unsupported signing algorithm '{}' (expected HS256, HS384 or HS512)", s)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WeakSecret(e) => Some(e),
            _ => None,
        }
    }
}

/// Authentication core configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Process-wide JWT signing secret
    pub secret_key: String,

    /// Signing algorithm (HMAC family; a single shared secret signs and
    /// verifies, so asymmetric algorithms are out of scope)
    pub algorithm: Algorithm,

    /// Access token lifetime; refresh tokens use a fixed 30 days
    pub access_token_ttl: Duration,

    /// Login rate limiter parameters
    pub lockout: LockoutPolicy,
}

impl AuthConfig {
    /// Create a new builder
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// The signing secret is validated against the strength policy for the
    /// environment named by `APP_ENV`/`RUST_ENV`; a production deployment
    /// with a short or low-entropy key fails fast here rather than issuing
    /// forgeable tokens.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = std::env::var("SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let environment = std::env::var("APP_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_else(|_| "development".to_string());
        SigningSecretPolicy::for_environment(&environment)
            .validate(&secret_key)
            .map_err(ConfigError::WeakSecret)?;

        let algorithm = match std::env::var("ALGORITHM") {
            Ok(name) => parse_algorithm(&name)?,
            Err(_) => Algorithm::HS256,
        };

        let access_minutes = std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ACCESS_TTL_MINUTES);

        let mut lockout = LockoutPolicy::default();
        if let Some(max) = env_u32("MAX_LOGIN_ATTEMPTS") {
            lockout.max_attempts = max;
        }
        if let Some(secs) = env_u64("LOGIN_ATTEMPT_WINDOW_SECONDS") {
            lockout.attempt_window = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("LOGIN_BLOCK_DURATION_SECONDS") {
            lockout.block_duration = Duration::from_secs(secs);
        }

        Ok(Self {
            secret_key,
            algorithm,
            access_token_ttl: Duration::from_secs(access_minutes * 60),
            lockout,
        })
    }
}

fn env_u32(var: &str) -> Option<u32> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

fn env_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// Parse an HMAC-family algorithm name.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    match name.to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Builder for [`AuthConfig`]
///
/// Unlike [`AuthConfig::from_env`], the builder does not apply the secret
/// strength policy; programmatic construction is expected in tests and in
/// hosts that validate the secret themselves.
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    secret_key: Option<String>,
    algorithm: Option<Algorithm>,
    access_ttl_minutes: Option<u64>,
    lockout: Option<LockoutPolicy>,
}

impl AuthConfigBuilder {
    /// Set the signing secret (required)
    pub fn secret_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = Some(secret.into());
        self
    }

    /// Set the signing algorithm (default: HS256)
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the access token TTL in minutes (default: 15)
    pub fn access_ttl_minutes(mut self, minutes: u64) -> Self {
        self.access_ttl_minutes = Some(minutes);
        self
    }

    /// Set the lockout policy (default: [`LockoutPolicy::default`])
    pub fn lockout(mut self, policy: LockoutPolicy) -> Self {
        self.lockout = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AuthConfig, ConfigError> {
        let secret_key = self
            .secret_key
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let minutes = self.access_ttl_minutes.unwrap_or(DEFAULT_ACCESS_TTL_MINUTES);

        Ok(AuthConfig {
            secret_key,
            algorithm: self.algorithm.unwrap_or(Algorithm::HS256),
            access_token_ttl: Duration::from_secs(minutes * 60),
            lockout: self.lockout.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm("hs384").unwrap(), Algorithm::HS384);
        assert_eq!(parse_algorithm("HS512").unwrap(), Algorithm::HS512);
        assert!(matches!(
            parse_algorithm("RS256"),
            Err(ConfigError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let config = AuthConfig::builder()
            .secret_key("0123456789abcdef0123456789abcdef")
            .build()
            .unwrap();

        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.access_token_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.lockout.max_attempts, 5);
    }

    #[test]
    fn test_builder_overrides() {
        let config = AuthConfig::builder()
            .secret_key("0123456789abcdef0123456789abcdef")
            .algorithm(Algorithm::HS512)
            .access_ttl_minutes(5)
            .lockout(LockoutPolicy::builder().max_attempts(3).build())
            .build()
            .unwrap();

        assert_eq!(config.algorithm, Algorithm::HS512);
        assert_eq!(config.access_token_ttl, Duration::from_secs(300));
        assert_eq!(config.lockout.max_attempts, 3);
    }

    #[test]
    fn test_builder_requires_secret() {
        assert!(matches!(
            AuthConfig::builder().build(),
            Err(ConfigError::MissingSecret)
        ));
        assert!(matches!(
            AuthConfig::builder().secret_key("").build(),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_config_error_display() {
        assert!(ConfigError::MissingSecret.to_string().contains("SECRET_KEY"));
        assert!(ConfigError::UnsupportedAlgorithm("RS256".into())
            .to_string()
            .contains("RS256"));
    }
}
