use std::sync::Arc;

use crate::limit::Clock;

use crate::workflows::enrollment::{
    ApplicantId, ApplicantPage, ApplicantQuery, ApplicantRecord, ApplicantRepository,
    DocumentRenderer, EnrollmentError, EnrollmentService, EnrollmentStats, NotificationGateway,
};

use super::auth::{AuthError, AuthService};
use super::domain::{AdminIdentity, Session};
use super::repository::AdminDirectory;

/// Session-gated wrapper over the applicant store and the resend operation.
/// Nothing here adds business logic beyond parameter marshaling and the gate.
pub struct AdminService<A, R, D, N> {
    auth: Arc<AuthService<A>>,
    repository: Arc<R>,
    enrollment: Arc<EnrollmentService<R, D, N>>,
    clock: Arc<dyn Clock>,
}

impl<A, R, D, N> AdminService<A, R, D, N>
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(
        auth: Arc<AuthService<A>>,
        repository: Arc<R>,
        enrollment: Arc<EnrollmentService<R, D, N>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            auth,
            repository,
            enrollment,
            clock,
        }
    }

    pub fn login(
        &self,
        email: &str,
        password: &str,
        client_key: &str,
    ) -> Result<Session, AdminError> {
        Ok(self.auth.login(email, password, client_key)?)
    }

    pub fn logout(&self, token: Option<&str>) -> bool {
        token.map(|token| self.auth.logout(token)).unwrap_or(false)
    }

    pub fn identity(&self, token: Option<&str>) -> Result<AdminIdentity, AdminError> {
        Ok(self.auth.authenticate(token)?)
    }

    pub fn list(
        &self,
        token: Option<&str>,
        query: &ApplicantQuery,
    ) -> Result<ApplicantPage, AdminError> {
        self.auth.authenticate(token)?;
        Ok(self.repository.list(query)?)
    }

    pub fn stats(&self, token: Option<&str>) -> Result<EnrollmentStats, AdminError> {
        self.auth.authenticate(token)?;
        Ok(self.repository.stats(self.clock.now())?)
    }

    pub fn resend(
        &self,
        token: Option<&str>,
        id: &ApplicantId,
    ) -> Result<ApplicantRecord, AdminError> {
        self.auth.authenticate(token)?;
        Ok(self.enrollment.resend(id)?)
    }
}

/// Error raised by the admin service.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] crate::workflows::enrollment::RepositoryError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
}
