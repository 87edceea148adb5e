use std::sync::Arc;

use tracing::{error, warn};

use crate::limit::Clock;

use super::document::{DocumentError, DocumentRenderer};
use super::domain::{
    ApplicantId, ApplicantRecord, ApplicationId, DocumentRef, EnrollmentReceipt,
    EnrollmentSubmission,
};
use super::intake::{AgeError, IntakeError, IntakeGuard, ValidationError};
use super::notify::{NotificationError, NotificationGateway};
use super::repository::{ApplicantRepository, RepositoryError};

/// Service composing the intake guard, repository, document renderer, and
/// notification gateway.
pub struct EnrollmentService<R, D, N> {
    guard: IntakeGuard,
    repository: Arc<R>,
    renderer: Arc<D>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<R, D, N> EnrollmentService<R, D, N>
where
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(
        repository: Arc<R>,
        renderer: Arc<D>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            guard: IntakeGuard,
            repository,
            renderer,
            notifier,
            clock,
        }
    }

    /// Run the full intake pipeline. The insert is the durability boundary:
    /// once the row exists the enrollment has happened, and later render or
    /// delivery failures only leave the record in a degraded state that the
    /// admin surface exposes.
    pub fn submit(
        &self,
        submission: EnrollmentSubmission,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let now = self.clock.now();
        let applicant = self.guard.applicant_from_submission(submission, now)?;
        let applicant_id = applicant.id;
        let application_id = applicant.application_id.clone();

        if let Err(err) = self.repository.create(ApplicantRecord::new(applicant.clone())) {
            if matches!(err, RepositoryError::Conflict) {
                // a collision here means the id generator is broken
                error!(
                    application_id = %application_id.0,
                    "application id collision on insert"
                );
            }
            return Err(err.into());
        }

        let document = DocumentRef::for_application(&application_id);
        match self.renderer.render(&applicant) {
            Ok(bytes) => {
                if let Err(err) = self.repository.set_document(&applicant_id, document.clone()) {
                    warn!(
                        application_id = %application_id.0,
                        step = "document",
                        error = %err,
                        "failed to record document reference"
                    );
                }
                match self.notifier.send_confirmation(&applicant, &bytes) {
                    Ok(()) => {
                        if let Err(err) = self.repository.mark_notified(&applicant_id) {
                            warn!(
                                application_id = %application_id.0,
                                step = "notify",
                                error = %err,
                                "failed to record delivery flag"
                            );
                        }
                    }
                    Err(err) => {
                        warn!(
                            application_id = %application_id.0,
                            step = "notify",
                            error = %err,
                            "confirmation email failed; record left awaiting delivery"
                        );
                    }
                }
            }
            Err(err) => {
                warn!(
                    application_id = %application_id.0,
                    step = "document",
                    error = %err,
                    "confirmation document failed; record left undocumented"
                );
            }
        }

        Ok(EnrollmentReceipt {
            application_id,
            document,
        })
    }

    /// Regenerate the confirmation document on demand. Output depends only on
    /// the stored record, so repeated calls yield identical bytes.
    pub fn document(&self, application_id: &ApplicationId) -> Result<Vec<u8>, EnrollmentError> {
        let record = self
            .repository
            .get_by_application_id(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(self.renderer.render(&record.applicant)?)
    }

    /// Re-deliver the confirmation email; the recovery path for swallowed
    /// notification failures. Unlike `submit`, downstream failures propagate.
    pub fn resend(&self, id: &ApplicantId) -> Result<ApplicantRecord, EnrollmentError> {
        let record = self.repository.get(id)?.ok_or(RepositoryError::NotFound)?;
        let bytes = self.renderer.render(&record.applicant)?;
        self.notifier.send_confirmation(&record.applicant, &bytes)?;

        if record.document.is_none() {
            self.repository.set_document(
                &record.applicant.id,
                DocumentRef::for_application(&record.applicant.application_id),
            )?;
        }
        Ok(self.repository.mark_notified(&record.applicant.id)?)
    }
}

/// Error raised by the enrollment service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Age(#[from] AgeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl From<IntakeError> for EnrollmentError {
    fn from(value: IntakeError) -> Self {
        match value {
            IntakeError::Validation(err) => Self::Validation(err),
            IntakeError::Age(err) => Self::Age(err),
        }
    }
}
