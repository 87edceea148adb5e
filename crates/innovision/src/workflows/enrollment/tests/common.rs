use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::limit::{Clock, InMemoryCounterStore, RateLimiter, WindowPolicy};
use crate::workflows::enrollment::document::{DocumentError, DocumentRenderer};
use crate::workflows::enrollment::domain::{
    Applicant, ApplicantId, ApplicantRecord, ApplicationId, EnrollmentSubmission, Locale,
};
use crate::workflows::enrollment::memory::InMemoryApplicantRepository;
use crate::workflows::enrollment::notify::{NotificationError, NotificationGateway};
use crate::workflows::enrollment::repository::{
    ApplicantPage, ApplicantQuery, ApplicantRepository, EnrollmentStats, RepositoryError,
};
use crate::workflows::enrollment::router::{enrollment_router, PublicRoutes};
use crate::workflows::enrollment::service::EnrollmentService;

pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn submission() -> EnrollmentSubmission {
    EnrollmentSubmission {
        full_name: "Amina K.".to_string(),
        email: "amina@example.com".to_string(),
        birth_date: "2010-05-01".to_string(),
        wilaya: "Blida".to_string(),
        phone: "+213700000000".to_string(),
        course: "Robotics".to_string(),
        locale: Locale::Fr,
        consent: true,
    }
}

/// Deterministic renderer double; output embeds the application id the way
/// the real renderer does.
#[derive(Default)]
pub(super) struct StubRenderer;

impl DocumentRenderer for StubRenderer {
    fn render(&self, applicant: &Applicant) -> Result<Vec<u8>, DocumentError> {
        Ok(format!("%PDF-stub {}", applicant.application_id.0).into_bytes())
    }
}

pub(super) struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render(&self, _applicant: &Applicant) -> Result<Vec<u8>, DocumentError> {
        Err(DocumentError::Render("font table corrupted".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<ApplicationId>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<ApplicationId> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationGateway for RecordingNotifier {
    fn send_confirmation(
        &self,
        applicant: &Applicant,
        _document: &[u8],
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(applicant.application_id.clone());
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl NotificationGateway for FailingNotifier {
    fn send_confirmation(
        &self,
        _applicant: &Applicant,
        _document: &[u8],
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Transport(
            "relay rejected the connection".to_string(),
        ))
    }
}

pub(super) struct ConflictRepository;

impl ApplicantRepository for ConflictRepository {
    fn create(&self, _record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn get(&self, _id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(None)
    }

    fn get_by_application_id(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(None)
    }

    fn set_document(
        &self,
        _id: &ApplicantId,
        _document: crate::workflows::enrollment::domain::DocumentRef,
    ) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn mark_notified(&self, _id: &ApplicantId) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn list(&self, _query: &ApplicantQuery) -> Result<ApplicantPage, RepositoryError> {
        Ok(ApplicantPage {
            applicants: Vec::new(),
            total: 0,
        })
    }

    fn stats(&self, _now: DateTime<Utc>) -> Result<EnrollmentStats, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}

pub(super) type TestService = EnrollmentService<InMemoryApplicantRepository, StubRenderer, RecordingNotifier>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<InMemoryApplicantRepository>,
    Arc<RecordingNotifier>,
    Arc<ManualClock>,
) {
    let repository = Arc::new(InMemoryApplicantRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::at(fixed_now()));
    let service = Arc::new(EnrollmentService::new(
        repository.clone(),
        Arc::new(StubRenderer),
        notifier.clone(),
        clock.clone(),
    ));
    (service, repository, notifier, clock)
}

pub(super) fn generous_policy() -> WindowPolicy {
    WindowPolicy {
        max_requests: 1_000,
        window_secs: 3_600,
    }
}

pub(super) fn public_router_with_policy(
    service: Arc<TestService>,
    clock: Arc<ManualClock>,
    enrollment_policy: WindowPolicy,
) -> axum::Router {
    let counters = Arc::new(InMemoryCounterStore::default());
    let routes = Arc::new(PublicRoutes {
        service,
        enrollment_limiter: RateLimiter::new(
            "enroll",
            enrollment_policy,
            counters.clone(),
            clock.clone(),
        ),
        document_limiter: RateLimiter::new("pdf", generous_policy(), counters, clock),
    });
    enrollment_router(routes)
}

pub(super) fn public_router(service: Arc<TestService>, clock: Arc<ManualClock>) -> axum::Router {
    public_router_with_policy(service, clock, generous_policy())
}
