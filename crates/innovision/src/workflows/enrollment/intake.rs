use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{
    Applicant, ApplicantId, ApplicationId, EnrollmentSubmission, MINIMUM_AGE,
};

/// Seconds in an average Gregorian year (365.25 days); the divisor used when
/// freezing age at submission time.
const AVERAGE_YEAR_SECS: i64 = 31_557_600;
const SECS_PER_DAY: i64 = 86_400;

/// One rejected field with a caller-correctable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: &'static str,
}

/// Structural rejection enumerating every offending field; nothing is
/// persisted when this is raised.
#[derive(Debug, thiserror::Error)]
#[error("invalid submission: {}", describe_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn describe_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{} ({})", violation.field, violation.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Business-rule rejection for applicants below the admission age, evaluated
/// only after structural validation passes.
#[derive(Debug, thiserror::Error)]
#[error("minimum enrollment age is {minimum}, computed {computed}")]
pub struct AgeError {
    pub computed: i64,
    pub minimum: u32,
}

/// Either rejection the intake step can produce.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Age(#[from] AgeError),
}

/// Turns a raw submission into a persisted-shape `Applicant`: structural
/// checks, the frozen-age computation, and id assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn applicant_from_submission(
        &self,
        submission: EnrollmentSubmission,
        now: DateTime<Utc>,
    ) -> Result<Applicant, IntakeError> {
        let mut violations = Vec::new();

        if submission.full_name.trim().is_empty() {
            violations.push(FieldViolation {
                field: "full_name",
                message: "required",
            });
        }
        let birth_date = NaiveDate::parse_from_str(submission.birth_date.trim(), "%Y-%m-%d").ok();
        if birth_date.is_none() {
            violations.push(FieldViolation {
                field: "birth_date",
                message: "must be a calendar date (YYYY-MM-DD)",
            });
        }
        if !email_shape_ok(&submission.email) {
            violations.push(FieldViolation {
                field: "email",
                message: "must be a valid address",
            });
        }
        if submission.phone.trim().is_empty() {
            violations.push(FieldViolation {
                field: "phone",
                message: "required",
            });
        }
        if submission.wilaya.trim().is_empty() {
            violations.push(FieldViolation {
                field: "wilaya",
                message: "required",
            });
        }
        if submission.course.trim().is_empty() {
            violations.push(FieldViolation {
                field: "course",
                message: "required",
            });
        }
        if !submission.consent {
            violations.push(FieldViolation {
                field: "consent",
                message: "must be accepted",
            });
        }

        if !violations.is_empty() {
            return Err(ValidationError { violations }.into());
        }
        // the parse succeeded or we returned above
        let birth_date = birth_date.unwrap_or_default();

        let computed = derive_age(birth_date, now);
        if computed < i64::from(MINIMUM_AGE) {
            return Err(AgeError {
                computed,
                minimum: MINIMUM_AGE,
            }
            .into());
        }

        Ok(Applicant {
            id: ApplicantId::generate(),
            application_id: ApplicationId::generate(now),
            full_name: submission.full_name.trim().to_string(),
            email: submission.email.trim().to_string(),
            birth_date,
            age: computed as u32,
            wilaya: submission.wilaya.trim().to_string(),
            phone: submission.phone.trim().to_string(),
            course: submission.course.trim().to_string(),
            locale: submission.locale,
            created_at: now,
        })
    }
}

/// Floor of elapsed average years between the birth date and the submission
/// instant. Negative when the birth date lies in the future.
pub(crate) fn derive_age(birth_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let days = now
        .date_naive()
        .signed_duration_since(birth_date)
        .num_days();
    (days * SECS_PER_DAY).div_euclid(AVERAGE_YEAR_SECS)
}

fn email_shape_ok(raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty() || value.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
}
