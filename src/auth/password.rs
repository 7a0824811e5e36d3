//! Credential verification
//!
//! Usernames map to argon2 PHC hash strings from configuration. There
//! is no registration flow; the operator provisions the map.

use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;

/// Verifies login credentials against stored password hashes
#[derive(Debug)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    /// Whether `username` has a usable entry at all.
    pub fn knows(&self, username: &str) -> bool {
        self.users
            .get(username)
            .map(|hash| !hash.is_empty())
            .unwrap_or(false)
    }

    /// Check a password for a known user.
    ///
    /// Unknown users and unparseable stored hashes count as a failed
    /// check, never as an error surfaced to the client.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let Some(hash) = self.users.get(username).filter(|hash| !hash.is_empty()) else {
            return false;
        };
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("stored hash for user {} is unusable: {}", username, err);
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.users.values().all(|hash| hash.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::PasswordHasher;

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("hashing succeeds")
            .to_string()
    }

    fn store() -> CredentialStore {
        let mut users = HashMap::new();
        users.insert("yorben".to_string(), hash("correct horse"));
        users.insert("broken".to_string(), "not-a-phc-hash".to_string());
        users.insert("disabled".to_string(), String::new());
        CredentialStore::new(users)
    }

    #[test]
    fn correct_password_verifies() {
        assert!(store().verify("yorben", "correct horse"));
    }

    #[test]
    fn wrong_password_fails() {
        assert!(!store().verify("yorben", "battery staple"));
    }

    #[test]
    fn unknown_user_fails() {
        let store = store();
        assert!(!store.knows("nobody"));
        assert!(!store.verify("nobody", "anything"));
    }

    #[test]
    fn unusable_hash_fails_closed() {
        let store = store();
        assert!(store.knows("broken"));
        assert!(!store.verify("broken", "anything"));
    }

    #[test]
    fn empty_hash_counts_as_unknown() {
        let store = store();
        assert!(!store.knows("disabled"));
        assert!(!store.verify("disabled", ""));
    }

    #[test]
    fn empty_store_reports_empty() {
        assert!(CredentialStore::new(HashMap::new()).is_empty());
        assert!(!store().is_empty());
    }
}
