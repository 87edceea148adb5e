use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::AdminUser;

/// Lookup surface for operator accounts. Email is the login identity and is
/// matched case-insensitively.
pub trait AdminDirectory: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<AdminUser>;
    fn insert(&self, user: AdminUser) -> Result<AdminUser, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("administrator already exists")]
    Conflict,
}

/// Map-backed directory; the seed administrator is inserted at startup.
#[derive(Default, Clone)]
pub struct InMemoryAdminDirectory {
    users: Arc<Mutex<HashMap<String, AdminUser>>>,
}

impl AdminDirectory for InMemoryAdminDirectory {
    fn find_by_email(&self, email: &str) -> Option<AdminUser> {
        let users = self.users.lock().expect("directory mutex poisoned");
        users.get(&email.trim().to_lowercase()).cloned()
    }

    fn insert(&self, user: AdminUser) -> Result<AdminUser, DirectoryError> {
        let mut users = self.users.lock().expect("directory mutex poisoned");
        let key = user.email.trim().to_lowercase();
        if users.contains_key(&key) {
            return Err(DirectoryError::Conflict);
        }
        users.insert(key, user.clone());
        Ok(user)
    }
}
