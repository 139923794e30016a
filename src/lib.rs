//! # Portcullis
//!
//! Local authentication core for Axum task-management backends.
//!
//! This crate provides the authentication subsystem of a task-management
//! web application: credential hashing, JWT issuance/verification with
//! refresh rotation, and login rate limiting with progressive backoff and
//! temporary lockout. The surrounding CRUD layer (users, tasks, file
//! attachments), routing, and persistence are external collaborators that
//! call into this core through [`Authenticator`] and the [`store::UserStore`]
//! seam.
//!
//! ## Features
//!
//! - **Credential Hashing** (IA-5): Argon2id with per-hash salts
//! - **Token Issuance** (IA-5, SC-12): stateless HS256/384/512 JWTs with a
//!   `type` claim separating access from refresh tokens
//! - **Login Rate Limiting** (AC-7): sliding-window tracking, progressive
//!   delay, temporary lockout
//! - **Security Event Logging** (AU-2, AU-3): structured audit events via
//!   `tracing`
//! - **Secure Error Handling** (SI-11): anti-enumeration error taxonomy
//!   with HTTP mappings
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use portcullis::{Authenticator, AuthConfig};
//! use portcullis::observability::{self, ObservabilityConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     observability::init(&ObservabilityConfig::from_env())?;
//!
//!     let config = AuthConfig::from_env()?;
//!     let store = Arc::new(MyUserStore::connect().await?); // your UserStore impl
//!     let auth = Authenticator::new(&config, store);
//!
//!     // In the login handler:
//!     let pair = auth.login("a@x.com", "password").await?;
//!     // -> { "access_token": ..., "refresh_token": ..., "token_type": "bearer" }
//!     Ok(())
//! }
//! ```
//!
//! ## Deployment Notes
//!
//! Rate-limiter state lives in process memory and resets on restart; a
//! multi-instance deployment rate-limits per instance. Tokens are stateless
//! and cannot be revoked before expiry; there is no revocation list and no
//! signing-key rotation.

pub mod authenticator;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod middleware;
pub mod observability;
pub mod rate_limit;
pub mod secret;
pub mod store;
pub mod token;

// Re-exports
pub use authenticator::Authenticator;
pub use config::{AuthConfig, AuthConfigBuilder, ConfigError};
pub use credential::CredentialHasher;
pub use error::{AuthError, INVALID_CREDENTIALS_MESSAGE};
pub use events::{SecurityEvent, Severity};
pub use middleware::{require_auth, CurrentUser};
pub use rate_limit::{LockoutPolicy, LoginRateLimiter};
pub use store::{InMemoryUserStore, Role, User, UserStore};
pub use token::{Claims, TokenKind, TokenPair, TokenService};
