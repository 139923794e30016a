//! Credential Hashing (IA-5)
//!
//! One-way hashing and verification for user secrets using Argon2id with
//! per-hash random salts. Two secret classes flow through here: the login
//! password and the secret word used for the password-reset challenge. Both
//! use the same algorithm and parameters; the hashes are stored in separate
//! columns and verified against separate inputs, so sharing the routine
//! does not let one secret stand in for the other.
//!
//! # Contract
//!
//! - [`CredentialHasher::hash`] fails only on underlying primitive failure,
//!   never on the input value.
//! - [`CredentialHasher::verify`] returns `false` (never an error) on any
//!   mismatch or malformed stored hash. Internal failures must not leak
//!   into authentication decisions.
//!
//! Hashing is CPU-bound with no I/O and no shared state; it is safe to run
//! fully in parallel. The produced hash is a PHC-format string
//! (`$argon2id$...`) that embeds salt and parameters.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::error::AuthError;

/// Argon2id credential hasher.
///
/// Cheap to construct and `Clone`; holds only the algorithm parameters.
#[derive(Clone, Default)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish()
    }
}

impl CredentialHasher {
    /// Create a hasher with the library's default Argon2id parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a secret with a fresh random salt.
    ///
    /// Output is non-deterministic: hashing the same secret twice yields
    /// different strings, each of which verifies against the secret.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a secret against a stored PHC-format hash.
    ///
    /// Returns `true` iff the secret, hashed with the salt and parameters
    /// embedded in `stored`, matches. Any mismatch, parse failure, or
    /// primitive failure degrades to `false`.
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(_) => {
                // A hash we wrote can't be malformed; this indicates store
                // corruption, which must still read as "no match".
                tracing::warn!("stored credential hash failed to parse");
                return false;
            }
        };

        self.argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify_round_trip() {
        let hasher = CredentialHasher::new();
        let hash = hasher.hash("correct horse battery staple").unwrap();
        assert!(hasher.verify("correct horse battery staple", &hash));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let hasher = CredentialHasher::new();
        let hash = hasher.hash("p1").unwrap();
        assert!(!hasher.verify("p2", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = CredentialHasher::new();
        let a = hasher.hash("same secret").unwrap();
        let b = hasher.hash("same secret").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same secret", &a));
        assert!(hasher.verify("same secret", &b));
    }

    #[test]
    fn test_hash_is_phc_format() {
        let hasher = CredentialHasher::new();
        let hash = hasher.hash("anything").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_malformed_hash_verifies_false() {
        let hasher = CredentialHasher::new();
        assert!(!hasher.verify("secret", "not-a-phc-hash"));
        assert!(!hasher.verify("secret", ""));
        assert!(!hasher.verify("secret", "$argon2id$truncated"));
    }

    #[test]
    fn test_empty_secret_still_hashes() {
        // Input value never causes a hash-side error; policy checks on
        // password content belong to the registration layer.
        let hasher = CredentialHasher::new();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash));
        assert!(!hasher.verify("x", &hash));
    }
}
