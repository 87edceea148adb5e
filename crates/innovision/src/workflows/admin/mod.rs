//! Authenticated admin surface: login/logout, applicant listing with typed
//! filters, aggregate statistics, and the resend recovery operation.

pub mod auth;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{hash_password, AuthError, AuthService, SessionStore};
pub use domain::{AdminId, AdminIdentity, AdminUser, Session, SessionToken, DEFAULT_ADMIN_ROLE};
pub use repository::{AdminDirectory, DirectoryError, InMemoryAdminDirectory};
pub use router::{admin_router, AdminRoutes};
pub use service::{AdminError, AdminService};
