//! Checks a username/password pair against the identity store.

use std::sync::Arc;

use tracing::debug;

use adminhub_core::error::AppError;
use adminhub_core::result::AppResult;
use adminhub_database::repositories::UserRepository;
use adminhub_entity::user::User;

use crate::password::PasswordHasher;

const AUTH_FAILED_MESSAGE: &str = "Invalid username or password";

/// Verifies credentials without revealing which half was wrong.
///
/// Account status is deliberately not checked here; callers decide what
/// an inactive account means for their flow.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    /// Verified against when the username is unknown, so both failure
    /// paths do the same hashing work.
    dummy_hash: Arc<str>,
}

impl CredentialVerifier {
    /// Creates a verifier. Fails only if the dummy hash cannot be computed.
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher) -> AppResult<Self> {
        let dummy_hash = hasher.hash_password("adminhub-dummy-password")?;
        Ok(Self {
            users,
            hasher,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Returns the user when the password matches, `AuthFailed` otherwise.
    pub async fn verify(&self, username: &str, password: &str) -> AppResult<User> {
        let Some(user) = self.users.find_by_username(username).await? else {
            let _ = self.hasher.verify_password(password, &self.dummy_hash);
            debug!(username = %username, "Login attempt for unknown username");
            return Err(AppError::auth_failed(AUTH_FAILED_MESSAGE));
        };

        if !self.hasher.verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(AppError::auth_failed(AUTH_FAILED_MESSAGE));
        }

        Ok(user)
    }
}
