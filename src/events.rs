//! Security Event Logging (AU-2, AU-3)
//!
//! Structured logging for security-relevant authentication events as
//! required by NIST SP 800-53 AU-2 (Audit Events) and AU-3 (Content of
//! Audit Records).
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::events::SecurityEvent;
//! use portcullis::security_event;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationSuccess,
//!     identity = %email,
//!     "User authenticated"
//! );
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     identity = %email,
//!     reason = "invalid_password",
//!     "Authentication failed"
//! );
//! ```

use std::fmt;

/// Security event categories for audit logging.
///
/// These align with NIST SP 800-53 AU-2 auditable events, restricted to the
/// events this crate can observe. Application-specific events (registration,
/// task access decisions, etc.) belong in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Successful user authentication
    AuthenticationSuccess,
    /// Failed authentication attempt
    AuthenticationFailure,

    // Token events
    /// Access/refresh token pair issued after login
    TokenIssued,
    /// New access token minted from a refresh token
    TokenRefreshed,
    /// Presented token failed signature, structure, or expiry checks
    TokenRejected,

    // Credential lifecycle events
    /// Password changed by the account owner
    PasswordChanged,
    /// Password reset via the secret-word challenge
    PasswordReset,

    // Rate limiting events
    /// Login attempt rejected while an identity is blocked
    RateLimitExceeded,
    /// Identity blocked after exceeding the attempt threshold
    AccountLocked,
    /// Identity unblocked (expiry or admin reset)
    AccountUnlocked,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure => "authentication",

            Self::TokenIssued | Self::TokenRefreshed | Self::TokenRejected => "token",

            Self::PasswordChanged | Self::PasswordReset => "credential",

            Self::RateLimitExceeded | Self::AccountLocked | Self::AccountUnlocked => "security",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            // High - security-relevant failures
            Self::AuthenticationFailure
            | Self::TokenRejected
            | Self::RateLimitExceeded
            | Self::AccountLocked => Severity::High,

            // Medium - important state changes
            Self::AuthenticationSuccess
            | Self::PasswordChanged
            | Self::PasswordReset
            | Self::AccountUnlocked => Severity::Medium,

            // Low - routine operations
            Self::TokenIssued | Self::TokenRefreshed => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::TokenIssued => "token_issued",
            Self::TokenRefreshed => "token_refreshed",
            Self::TokenRejected => "token_rejected",
            Self::PasswordChanged => "password_changed",
            Self::PasswordReset => "password_reset",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Log a security event with structured fields.
///
/// Provides consistent formatting for security-relevant events as required
/// by NIST SP 800-53 AU-3. The macro automatically includes:
/// - `security_event`: Event type name
/// - `category`: Event category
/// - `severity`: Event severity level
///
/// Identities (emails) are loggable fields; credential material never is.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::events::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::events::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::events::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;
