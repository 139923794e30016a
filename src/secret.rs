//! Signing Secret Validation and Generation (IA-5, SC-12)
//!
//! Environment-aware validation of the JWT signing secret, so a weak key
//! never makes it into token issuance. Checked once at configuration load;
//! there is no key rotation (see crate docs).
//!
//! # Checks
//!
//! - Minimum length per environment
//! - Weak/common pattern detection
//! - Shannon entropy floor
//! - Character diversity for production
//!
//! # Example
//!
//! ```
//! use portcullis::secret::{generate_for_environment, SigningSecretPolicy};
//!
//! let policy = SigningSecretPolicy::for_environment("production");
//! let secret = generate_for_environment("production");
//! assert!(policy.validate(&secret).is_ok());
//! ```

use std::collections::HashMap;
use std::fmt;

/// Error type for signing-secret validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SigningSecretError {
    /// Secret is too short for the target environment
    TooShort {
        actual: usize,
        minimum: usize,
        context: String,
    },
    /// Secret contains a weak/common pattern
    WeakPattern { pattern: String },
    /// Secret has insufficient entropy
    LowEntropy {
        actual: f64,
        minimum: f64,
        context: String,
    },
    /// Secret lacks required character diversity
    InsufficientDiversity { missing: Vec<String> },
}

impl fmt::Display for SigningSecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual, minimum, context } => {
                write!(
                    f,
                    "Signing secret length ({} chars) is below minimum ({} chars) for {}",
                    actual, minimum, context
                )
            }
            Self::WeakPattern { pattern } => {
                write!(f, "Signing secret contains weak pattern: '{}'", pattern)
            }
            Self::LowEntropy { actual, minimum, context } => {
                write!(
                    f,
                    "Signing secret entropy ({:.1} bits) is below minimum ({:.1} bits) for {}",
                    actual, minimum, context
                )
            }
            Self::InsufficientDiversity { missing } => {
                write!(f, "Signing secret must contain: {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for SigningSecretError {}

/// Policy for signing-secret validation.
///
/// Requirements scale with the deployment environment; production demands a
/// long, diverse, high-entropy key while development stays permissive.
#[derive(Debug, Clone)]
pub struct SigningSecretPolicy {
    /// Minimum secret length in characters
    pub min_length: usize,
    /// Minimum Shannon entropy in bits
    pub min_entropy: f64,
    /// Whether to require character diversity (upper, lower, digit, special)
    pub require_diversity: bool,
    /// Whether to check for weak patterns
    pub check_weak_patterns: bool,
    /// Context string for error messages
    pub context: String,
}

impl Default for SigningSecretPolicy {
    fn default() -> Self {
        Self::for_environment("development")
    }
}

impl SigningSecretPolicy {
    /// Create a policy for a specific environment.
    ///
    /// - `production`: 64 char min, 128-bit entropy, diversity required
    /// - `staging`: 48 char min, 96-bit entropy, diversity required
    /// - `testing`: 32 char min, 64-bit entropy
    /// - `development` (default): 32 char min, 32-bit entropy
    pub fn for_environment(environment: &str) -> Self {
        match environment.to_lowercase().as_str() {
            "production" | "prod" => Self {
                min_length: 64,
                min_entropy: 128.0,
                require_diversity: true,
                check_weak_patterns: true,
                context: "production environment".to_string(),
            },
            "staging" | "stage" => Self {
                min_length: 48,
                min_entropy: 96.0,
                require_diversity: true,
                check_weak_patterns: true,
                context: "staging environment".to_string(),
            },
            "testing" | "test" => Self {
                min_length: 32,
                min_entropy: 64.0,
                require_diversity: false,
                check_weak_patterns: true,
                context: "testing environment".to_string(),
            },
            _ => Self {
                min_length: 32,
                min_entropy: 32.0,
                require_diversity: false,
                check_weak_patterns: true,
                context: "development environment".to_string(),
            },
        }
    }

    /// Validate a secret against this policy.
    pub fn validate(&self, secret: &str) -> Result<(), SigningSecretError> {
        if secret.len() < self.min_length {
            return Err(SigningSecretError::TooShort {
                actual: secret.len(),
                minimum: self.min_length,
                context: self.context.clone(),
            });
        }

        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(secret) {
                return Err(SigningSecretError::WeakPattern {
                    pattern: pattern.to_string(),
                });
            }
        }

        let entropy = shannon_entropy(secret);
        if entropy < self.min_entropy {
            return Err(SigningSecretError::LowEntropy {
                actual: entropy,
                minimum: self.min_entropy,
                context: self.context.clone(),
            });
        }

        if self.require_diversity {
            let missing = missing_character_classes(secret);
            if !missing.is_empty() {
                return Err(SigningSecretError::InsufficientDiversity { missing });
            }
        }

        Ok(())
    }
}

/// Check for weak patterns in the secret.
fn find_weak_pattern(secret: &str) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "secret", "password", "admin", "123456", "qwerty", "default",
        "example", "test", "demo", "sample", "temp", "changeme",
        "letmein", "welcome",
    ];

    let secret_lower = secret.to_lowercase();
    WEAK_PATTERNS
        .iter()
        .find(|p| secret_lower.contains(*p))
        .copied()
}

/// Character classes absent from the secret.
fn missing_character_classes(secret: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !secret.chars().any(|c| c.is_uppercase()) {
        missing.push("uppercase letters".to_string());
    }
    if !secret.chars().any(|c| c.is_lowercase()) {
        missing.push("lowercase letters".to_string());
    }
    if !secret.chars().any(|c| c.is_ascii_digit()) {
        missing.push("digits".to_string());
    }
    if !secret.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        missing.push("special characters".to_string());
    }

    missing
}

/// Total Shannon entropy of a string in bits (per-char entropy × length).
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut char_counts: HashMap<char, usize> = HashMap::new();
    let total = s.len() as f64;

    for c in s.chars() {
        *char_counts.entry(c).or_insert(0) += 1;
    }

    let mut entropy = 0.0;
    for count in char_counts.values() {
        let probability = *count as f64 / total;
        entropy -= probability * probability.log2();
    }

    entropy * total
}

/// Generate a cryptographically secure random secret of the given length.
///
/// Draws from A-Z, a-z, 0-9 and special characters so that a generated
/// secret satisfies the diversity requirement with overwhelming probability.
pub fn generate_secret(length: usize) -> String {
    use rand::Rng;

    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?";

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a secret that passes validation for the given environment.
///
/// Retries a handful of times in the (unlikely) event a generated secret
/// misses the entropy or diversity bar, then falls back to a longer one.
pub fn generate_for_environment(environment: &str) -> String {
    let policy = SigningSecretPolicy::for_environment(environment);
    let length = policy.min_length.max(64);

    for _ in 0..10 {
        let secret = generate_secret(length);
        if policy.validate(&secret).is_ok() {
            return secret;
        }
    }

    generate_secret(length + 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_for_environment() {
        let prod = SigningSecretPolicy::for_environment("production");
        assert_eq!(prod.min_length, 64);
        assert!(prod.require_diversity);

        let dev = SigningSecretPolicy::for_environment("development");
        assert_eq!(dev.min_length, 32);
        assert!(!dev.require_diversity);
    }

    #[test]
    fn test_validate_too_short() {
        let policy = SigningSecretPolicy::for_environment("production");
        assert!(matches!(
            policy.validate("short"),
            Err(SigningSecretError::TooShort { .. })
        ));
    }

    #[test]
    fn test_validate_weak_pattern() {
        let policy = SigningSecretPolicy::for_environment("development");
        // Long enough but contains "password"
        let result = policy.validate("this-is-a-password-that-is-long-enough");
        assert!(matches!(result, Err(SigningSecretError::WeakPattern { .. })));
    }

    #[test]
    fn test_validate_low_entropy() {
        let policy = SigningSecretPolicy::for_environment("production");
        let result = policy
            .validate("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(matches!(result, Err(SigningSecretError::LowEntropy { .. })));
    }

    #[test]
    fn test_validate_insufficient_diversity() {
        let mut policy = SigningSecretPolicy::for_environment("production");
        policy.min_entropy = 10.0;

        let result = policy
            .validate("abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyzabcdefghijkl");
        assert!(matches!(
            result,
            Err(SigningSecretError::InsufficientDiversity { .. })
        ));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!(shannon_entropy("aaaaaaaaaa") < 1.0);
        assert!(shannon_entropy("aB3$xY9!pQ") > 30.0);
        assert_eq!(shannon_entropy(""), 0.0);
    }

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret(64);
        assert_eq!(secret.len(), 64);
        assert!(shannon_entropy(&secret) > 100.0);
    }

    #[test]
    fn test_generate_for_environment_passes_validation() {
        let secret = generate_for_environment("production");
        let policy = SigningSecretPolicy::for_environment("production");
        assert!(policy.validate(&secret).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = SigningSecretError::TooShort {
            actual: 10,
            minimum: 64,
            context: "production environment".to_string(),
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("64"));
    }
}
