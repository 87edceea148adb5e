use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::limit::{Clock, InMemoryCounterStore, RateLimiter, WindowPolicy};
use crate::workflows::admin::auth::{hash_password, AuthService};
use crate::workflows::admin::domain::{AdminId, AdminUser, DEFAULT_ADMIN_ROLE};
use crate::workflows::admin::repository::{AdminDirectory, InMemoryAdminDirectory};
use crate::workflows::admin::router::{admin_router, AdminRoutes};
use crate::workflows::admin::service::AdminService;
use crate::workflows::enrollment::document::{DocumentError, DocumentRenderer};
use crate::workflows::enrollment::domain::{Applicant, EnrollmentSubmission, Locale};
use crate::workflows::enrollment::memory::InMemoryApplicantRepository;
use crate::workflows::enrollment::notify::{NotificationError, NotificationGateway};
use crate::workflows::enrollment::service::EnrollmentService;

pub(super) const ADMIN_EMAIL: &str = "directeur@innovision-school.dz";
pub(super) const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub(super) const SESSION_MAX_AGE_SECS: u64 = 3_600;

pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += delta;
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

#[derive(Default)]
pub(super) struct StubRenderer;

impl DocumentRenderer for StubRenderer {
    fn render(&self, applicant: &Applicant) -> Result<Vec<u8>, DocumentError> {
        Ok(format!("%PDF-stub {}", applicant.application_id.0).into_bytes())
    }
}

#[derive(Default)]
pub(super) struct CountingNotifier {
    failures_remaining: Mutex<u32>,
    sent: Mutex<u32>,
}

impl CountingNotifier {
    pub(super) fn failing_once() -> Self {
        Self {
            failures_remaining: Mutex::new(1),
            sent: Mutex::new(0),
        }
    }

    pub(super) fn sent_count(&self) -> u32 {
        *self.sent.lock().expect("notifier mutex poisoned")
    }
}

impl NotificationGateway for CountingNotifier {
    fn send_confirmation(
        &self,
        _applicant: &Applicant,
        _document: &[u8],
    ) -> Result<(), NotificationError> {
        let mut failures = self
            .failures_remaining
            .lock()
            .expect("notifier mutex poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(NotificationError::Transport(
                "relay rejected the connection".to_string(),
            ));
        }
        *self.sent.lock().expect("notifier mutex poisoned") += 1;
        Ok(())
    }
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

pub(super) fn seeded_directory(clock: &dyn Clock) -> Arc<InMemoryAdminDirectory> {
    let directory = Arc::new(InMemoryAdminDirectory::default());
    directory
        .insert(AdminUser {
            id: AdminId::generate(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(ADMIN_PASSWORD).expect("hashing succeeds"),
            role: DEFAULT_ADMIN_ROLE.to_string(),
            created_at: clock.now(),
        })
        .expect("seed insert succeeds");
    directory
}

pub(super) type TestAdminService = AdminService<
    InMemoryAdminDirectory,
    InMemoryApplicantRepository,
    StubRenderer,
    CountingNotifier,
>;

pub(super) struct Harness {
    pub(super) admin: Arc<TestAdminService>,
    pub(super) enrollment:
        Arc<EnrollmentService<InMemoryApplicantRepository, StubRenderer, CountingNotifier>>,
    pub(super) repository: Arc<InMemoryApplicantRepository>,
    pub(super) notifier: Arc<CountingNotifier>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn build_harness(notifier: CountingNotifier) -> Harness {
    let clock = Arc::new(ManualClock::at(fixed_now()));
    let repository = Arc::new(InMemoryApplicantRepository::default());
    let notifier = Arc::new(notifier);
    let enrollment = Arc::new(EnrollmentService::new(
        repository.clone(),
        Arc::new(StubRenderer),
        notifier.clone(),
        clock.clone(),
    ));
    let directory = seeded_directory(clock.as_ref());
    let auth = Arc::new(AuthService::new(
        directory,
        clock.clone(),
        SESSION_MAX_AGE_SECS,
    ));
    let admin = Arc::new(AdminService::new(
        auth,
        repository.clone(),
        enrollment.clone(),
        clock.clone(),
    ));

    Harness {
        admin,
        enrollment,
        repository,
        notifier,
        clock,
    }
}

pub(super) fn admin_test_router(harness: &Harness) -> axum::Router {
    let routes = Arc::new(AdminRoutes {
        service: harness.admin.clone(),
        limiter: RateLimiter::new(
            "admin",
            WindowPolicy {
                max_requests: 1_000,
                window_secs: 900,
            },
            Arc::new(InMemoryCounterStore::default()),
            harness.clock.clone(),
        ),
    });
    admin_router(routes)
}

pub(super) fn login_token(harness: &Harness) -> String {
    harness
        .admin
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, "10.0.0.9")
        .expect("login succeeds")
        .token
        .0
}
