//! Enrollment intake: validation, frozen age derivation, id assignment,
//! persistence, confirmation document rendering, and email notification.
//!
//! Persistence is the durability boundary. Render and delivery failures
//! never roll an enrollment back; they leave the record in a degraded
//! `DeliveryState` that the admin surface reports.

pub mod document;
pub mod domain;
pub mod intake;
pub mod memory;
pub mod notify;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use document::{ConfirmationPdfRenderer, DocumentError, DocumentRenderer};
pub use domain::{
    AgeBand, Applicant, ApplicantId, ApplicantRecord, ApplicantView, ApplicationId,
    DeliveryState, DocumentRef, EnrollmentReceipt, EnrollmentSubmission, Locale, MINIMUM_AGE,
};
pub use intake::{AgeError, FieldViolation, IntakeError, IntakeGuard, ValidationError};
pub use memory::InMemoryApplicantRepository;
pub use notify::{NotificationError, NotificationGateway, SmtpNotifier};
pub use repository::{
    AgeBandCount, ApplicantPage, ApplicantQuery, ApplicantRepository, CourseCount, DailyCount,
    EnrollmentStats, RepositoryError, SortField, SortOrder, WilayaCount, DEFAULT_PAGE_SIZE,
};
pub use router::{enrollment_router, PublicRoutes};
pub use service::{EnrollmentError, EnrollmentService};
