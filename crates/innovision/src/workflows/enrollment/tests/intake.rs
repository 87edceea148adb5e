use super::common::*;
use crate::workflows::enrollment::domain::APPLICATION_ID_PREFIX;
use crate::workflows::enrollment::intake::{derive_age, IntakeError, IntakeGuard};
use chrono::NaiveDate;

#[test]
fn valid_submission_becomes_an_applicant_with_frozen_age() {
    let applicant = IntakeGuard
        .applicant_from_submission(submission(), fixed_now())
        .expect("valid submission accepted");

    assert_eq!(applicant.age, 14);
    assert_eq!(applicant.full_name, "Amina K.");
    assert_eq!(applicant.created_at, fixed_now());
    assert!(applicant.application_id.is_well_formed());
    assert!(applicant
        .application_id
        .0
        .starts_with(&format!("{APPLICATION_ID_PREFIX}-")));
}

#[test]
fn every_offending_field_is_enumerated() {
    let mut bad = submission();
    bad.full_name = "  ".to_string();
    bad.email = "not-an-address".to_string();
    bad.phone = String::new();
    bad.consent = false;

    match IntakeGuard.applicant_from_submission(bad, fixed_now()) {
        Err(IntakeError::Validation(err)) => {
            let fields: Vec<&str> = err
                .violations
                .iter()
                .map(|violation| violation.field)
                .collect();
            assert_eq!(fields, vec!["full_name", "email", "phone", "consent"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn malformed_email_shapes_are_rejected() {
    for email in ["plain", "@nodomain.com", "user@", "user@dotless", "user@.start", "a b@c.d"] {
        let mut bad = submission();
        bad.email = email.to_string();
        match IntakeGuard.applicant_from_submission(bad, fixed_now()) {
            Err(IntakeError::Validation(err)) => {
                assert!(
                    err.violations
                        .iter()
                        .any(|violation| violation.field == "email"),
                    "email '{email}' should be rejected"
                );
            }
            other => panic!("expected validation error for '{email}', got {other:?}"),
        }
    }
}

#[test]
fn consent_must_be_strictly_true() {
    let mut bad = submission();
    bad.consent = false;
    match IntakeGuard.applicant_from_submission(bad, fixed_now()) {
        Err(IntakeError::Validation(err)) => {
            assert!(err
                .violations
                .iter()
                .any(|violation| violation.field == "consent"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn unparseable_birth_dates_join_the_field_violations() {
    let mut bad = submission();
    bad.birth_date = "01/05/2010".to_string();
    bad.phone = String::new();
    match IntakeGuard.applicant_from_submission(bad, fixed_now()) {
        Err(IntakeError::Validation(err)) => {
            let fields: Vec<&str> = err
                .violations
                .iter()
                .map(|violation| violation.field)
                .collect();
            assert_eq!(fields, vec!["birth_date", "phone"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn applicants_below_minimum_age_are_rejected() {
    let mut young = submission();
    young.birth_date = "2019-01-01".to_string();
    match IntakeGuard.applicant_from_submission(young, fixed_now()) {
        Err(IntakeError::Age(err)) => {
            assert_eq!(err.minimum, 8);
            assert!(err.computed < 8);
        }
        other => panic!("expected age error, got {other:?}"),
    }
}

#[test]
fn age_gate_runs_only_after_structural_validation() {
    let mut bad = submission();
    bad.birth_date = "2019-01-01".to_string();
    bad.consent = false;
    // both problems present: the structural rejection wins
    assert!(matches!(
        IntakeGuard.applicant_from_submission(bad, fixed_now()),
        Err(IntakeError::Validation(_))
    ));
}

#[test]
fn age_is_the_floor_of_elapsed_average_years() {
    let now = fixed_now();
    let cases = [
        (NaiveDate::from_ymd_opt(2010, 5, 1).expect("valid"), 14),
        (NaiveDate::from_ymd_opt(2016, 6, 1).expect("valid"), 8),
        (NaiveDate::from_ymd_opt(2016, 6, 2).expect("valid"), 7),
        (NaiveDate::from_ymd_opt(1990, 1, 15).expect("valid"), 34),
    ];
    for (birth_date, expected) in cases {
        assert_eq!(derive_age(birth_date, now), expected, "for {birth_date}");
    }
}

#[test]
fn future_birth_dates_yield_negative_ages() {
    let future = NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date");
    assert!(derive_age(future, fixed_now()) < 0);
}

#[test]
fn leading_and_trailing_whitespace_is_trimmed() {
    let mut padded = submission();
    padded.full_name = "  Amina K.  ".to_string();
    padded.email = " amina@example.com ".to_string();
    let applicant = IntakeGuard
        .applicant_from_submission(padded, fixed_now())
        .expect("padded submission accepted");
    assert_eq!(applicant.full_name, "Amina K.");
    assert_eq!(applicant.email, "amina@example.com");
}
