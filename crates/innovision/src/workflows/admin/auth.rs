use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Duration;

use crate::limit::{Clock, Decision, LoginThrottle};

use super::domain::{AdminIdentity, Session, SessionToken};
use super::repository::AdminDirectory;

/// Authentication failure. Invalid-credential responses never reveal which
/// part of the credential was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("too many failed login attempts")]
    Throttled { retry_after_secs: u64 },
    #[error("credential hashing failed")]
    Hash,
}

/// Argon2 hash for provisioning; used by the `admin hash-password` command.
pub fn hash_password(raw: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hash)
}

fn verify_password(raw: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Bearer-token sessions with a bounded lifetime. Expired entries are
/// dropped on resolution.
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    max_age: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, max_age_secs: u64) -> Self {
        Self {
            clock,
            max_age: Duration::seconds(max_age_secs.min(i64::MAX as u64) as i64),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, admin: AdminIdentity) -> Session {
        let session = Session {
            token: SessionToken::generate(),
            admin,
            expires_at: self.clock.now() + self.max_age,
        };
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(session.token.0.clone(), session.clone());
        session
    }

    pub fn resolve(&self, token: &str) -> Option<AdminIdentity> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        match sessions.get(token) {
            Some(session) if session.expires_at > now => Some(session.admin.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .remove(token)
            .is_some()
    }
}

/// Login, logout, and session resolution with throttled failures.
pub struct AuthService<A> {
    directory: Arc<A>,
    sessions: SessionStore,
    throttle: LoginThrottle,
}

impl<A> AuthService<A>
where
    A: AdminDirectory + 'static,
{
    pub fn new(directory: Arc<A>, clock: Arc<dyn Clock>, session_max_age_secs: u64) -> Self {
        Self {
            directory,
            sessions: SessionStore::new(clock.clone(), session_max_age_secs),
            throttle: LoginThrottle::new(clock),
        }
    }

    pub fn login(
        &self,
        email: &str,
        password: &str,
        client_key: &str,
    ) -> Result<Session, AuthError> {
        if let Decision::Blocked { retry_after_secs } = self.throttle.check(client_key) {
            return Err(AuthError::Throttled { retry_after_secs });
        }

        let Some(user) = self.directory.find_by_email(email) else {
            self.throttle.record_failure(client_key);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash) {
            self.throttle.record_failure(client_key);
            return Err(AuthError::InvalidCredentials);
        }

        self.throttle.reset(client_key);
        Ok(self.sessions.open(user.identity()))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    /// Resolve a bearer token to an operator identity; every admin operation
    /// passes through here.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AdminIdentity, AuthError> {
        token
            .and_then(|token| self.sessions.resolve(token))
            .ok_or(AuthError::Unauthenticated)
    }
}
