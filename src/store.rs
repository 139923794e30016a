//! User Store Seam
//!
//! The authentication core does not own user persistence; the surrounding
//! CRUD layer does. [`UserStore`] is the narrow contract the orchestrator
//! needs: look a user up by login identity and persist a replacement
//! password hash. Implement it over your database layer; the bundled
//! [`InMemoryUserStore`] serves tests and single-process tools.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// User Record
// ============================================================================

/// User role, a closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrative access
    Admin,
    /// Project manager: may assign tasks to others
    Pm,
    /// Regular user
    User,
}

impl Role {
    /// Role name as stored/serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Pm => "pm",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User record as seen by the authentication core.
///
/// Credential hashes are deliberately excluded from serialization: a `User`
/// rendered into any response never carries them.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Primary key in the owning store
    pub id: i64,
    /// Login identity
    pub email: String,
    /// Argon2id hash of the login password
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Argon2id hash of the password-reset secret word
    #[serde(skip_serializing)]
    pub secret_word_hash: String,
    /// Role within the task system
    pub role: Role,
    /// Administratively deactivated accounts cannot authenticate
    pub is_active: bool,
}

// ============================================================================
// Store Contract
// ============================================================================

/// Error from the backing store (connection failures, query errors).
///
/// Absence of a user is not an error; it is `Ok(None)`.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// The persistence contract the authentication core requires.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by login identity.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Replace the stored password hash for an identity.
    async fn set_password_hash(&self, email: &str, new_hash: &str) -> Result<(), StoreError>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory [`UserStore`] for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a user, keyed by email.
    pub fn insert(&self, user: User) {
        let mut users = self.users.write().expect("user map lock poisoned");
        users.insert(user.email.clone(), user);
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.read().expect("user map lock poisoned").len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().expect("user map lock poisoned");
        Ok(users.get(email).cloned())
    }

    async fn set_password_hash(&self, email: &str, new_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().expect("user map lock poisoned");
        match users.get_mut(email) {
            Some(user) => {
                user.password_hash = new_hash.to_string();
                Ok(())
            }
            None => Err(StoreError(format!("no user with email {email}"))),
        }
    }
}
