/// User Records
///
/// The credential flows only need to find a user by id or email and to
/// replace a stored password hash. `UserStore` is that seam; the in-memory
/// implementation backs the binary and the tests.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub handle: Option<String>,
    /// Encoded password hash record; `None` for accounts without a password
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(email: &str, handle: Option<String>, password_hash: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            handle,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

pub trait UserStore: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Emails compare case-insensitively
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// # Errors
    /// Returns `AuthError::EmailTaken` if the email is already registered
    fn insert(&self, user: UserRecord) -> Result<(), AppError>;

    /// Replace a stored hash, returning whether the user existed
    fn update_password_hash(&self, id: &str, password_hash: String) -> Result<bool, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("User store lock poisoned".to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserStore for InMemoryUserStore {
    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let wanted = normalize_email(email);
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|user| normalize_email(&user.email) == wanted)
            .cloned())
    }

    fn insert(&self, user: UserRecord) -> Result<(), AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let wanted = normalize_email(&user.email);
        if users
            .values()
            .any(|existing| normalize_email(&existing.email) == wanted)
        {
            return Err(AuthError::EmailTaken.into());
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    fn update_password_hash(&self, id: &str, password_hash: String) -> Result<bool, AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        Ok(match users.get_mut(id) {
            Some(user) => {
                user.password_hash = Some(password_hash);
                true
            }
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let store = InMemoryUserStore::new();
        let user = UserRecord::new("Ada@Example.com", Some("ada".to_string()), None);
        let id = user.id.clone();
        store.insert(user).unwrap();

        assert_eq!(store.find_by_id(&id).unwrap().unwrap().email, "Ada@Example.com");
        assert_eq!(store.find_by_email("ada@example.COM").unwrap().unwrap().id, id);
        assert!(store.find_by_email("grace@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(UserRecord::new("ada@example.com", None, None)).unwrap();

        match store.insert(UserRecord::new(" ADA@example.com ", None, None)) {
            Err(AppError::Auth(AuthError::EmailTaken)) => (),
            other => panic!("Expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_update_password_hash() {
        let store = InMemoryUserStore::new();
        let user = UserRecord::new("ada@example.com", None, Some("old".to_string()));
        let id = user.id.clone();
        store.insert(user).unwrap();

        assert!(store.update_password_hash(&id, "new".to_string()).unwrap());
        assert_eq!(
            store.find_by_id(&id).unwrap().unwrap().password_hash.as_deref(),
            Some("new")
        );
        assert!(!store.update_password_hash("missing", "x".to_string()).unwrap());
    }
}
