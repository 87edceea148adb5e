use super::common::*;
use crate::workflows::admin::auth::AuthError;
use crate::workflows::admin::service::AdminError;
use crate::workflows::enrollment::domain::DeliveryState;
use crate::workflows::enrollment::repository::ApplicantRepository;
use chrono::Duration;

#[test]
fn login_issues_a_resolvable_session() {
    let harness = build_harness(CountingNotifier::default());
    let session = harness
        .admin
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, "10.0.0.9")
        .expect("login succeeds");

    assert_eq!(session.admin.email, ADMIN_EMAIL);
    let identity = harness
        .admin
        .identity(Some(&session.token.0))
        .expect("session resolves");
    assert_eq!(identity.role, "admin");
}

#[test]
fn wrong_password_and_unknown_email_fail_alike() {
    let harness = build_harness(CountingNotifier::default());

    let wrong_password = harness
        .admin
        .login(ADMIN_EMAIL, "nope", "10.0.0.9")
        .expect_err("wrong password rejected");
    let unknown_email = harness
        .admin
        .login("ghost@innovision-school.dz", ADMIN_PASSWORD, "10.0.0.9")
        .expect_err("unknown email rejected");

    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(
        wrong_password,
        AdminError::Auth(AuthError::InvalidCredentials)
    ));
}

#[test]
fn repeated_failures_throttle_the_caller() {
    let harness = build_harness(CountingNotifier::default());

    for _ in 0..3 {
        let _ = harness.admin.login(ADMIN_EMAIL, "nope", "203.0.113.7");
    }
    match harness.admin.login(ADMIN_EMAIL, ADMIN_PASSWORD, "203.0.113.7") {
        Err(AdminError::Auth(AuthError::Throttled { retry_after_secs })) => {
            assert!(retry_after_secs > 0);
        }
        other => panic!("expected throttled login, got {other:?}"),
    }

    // another caller is unaffected
    assert!(harness
        .admin
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, "10.0.0.9")
        .is_ok());
}

#[test]
fn successful_login_resets_the_failure_ledger() {
    let harness = build_harness(CountingNotifier::default());

    for _ in 0..2 {
        let _ = harness.admin.login(ADMIN_EMAIL, "nope", "10.0.0.9");
    }
    assert!(harness
        .admin
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, "10.0.0.9")
        .is_ok());
    for _ in 0..2 {
        let _ = harness.admin.login(ADMIN_EMAIL, "nope", "10.0.0.9");
    }
    // failures did not accumulate past the reset
    assert!(harness
        .admin
        .login(ADMIN_EMAIL, ADMIN_PASSWORD, "10.0.0.9")
        .is_ok());
}

#[test]
fn sessions_expire_after_their_max_age() {
    let harness = build_harness(CountingNotifier::default());
    let token = login_token(&harness);

    harness
        .clock
        .advance(Duration::seconds(SESSION_MAX_AGE_SECS as i64 + 1));
    match harness.admin.identity(Some(&token)) {
        Err(AdminError::Auth(AuthError::Unauthenticated)) => {}
        other => panic!("expected expired session, got {other:?}"),
    }
}

#[test]
fn logout_revokes_the_session() {
    let harness = build_harness(CountingNotifier::default());
    let token = login_token(&harness);

    assert!(harness.admin.logout(Some(&token)));
    assert!(matches!(
        harness.admin.identity(Some(&token)),
        Err(AdminError::Auth(AuthError::Unauthenticated))
    ));
}

#[test]
fn unauthenticated_calls_return_no_applicant_data() {
    let harness = build_harness(CountingNotifier::default());
    harness
        .enrollment
        .submit(submission())
        .expect("submission succeeds");

    assert!(matches!(
        harness.admin.list(None, &Default::default()),
        Err(AdminError::Auth(AuthError::Unauthenticated))
    ));
    assert!(matches!(
        harness.admin.stats(None),
        Err(AdminError::Auth(AuthError::Unauthenticated))
    ));
    assert!(matches!(
        harness.admin.identity(Some("forged-token")),
        Err(AdminError::Auth(AuthError::Unauthenticated))
    ));
}

#[test]
fn resend_recovers_a_failed_delivery() {
    let harness = build_harness(CountingNotifier::failing_once());
    let receipt = harness
        .enrollment
        .submit(submission())
        .expect("enrollment succeeds despite delivery failure");

    let record = harness
        .repository
        .get_by_application_id(&receipt.application_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(record.state, DeliveryState::Documented);

    let token = login_token(&harness);
    let resent = harness
        .admin
        .resend(Some(&token), &record.applicant.id)
        .expect("resend succeeds once the relay recovers");
    assert_eq!(resent.state, DeliveryState::Notified);
    assert_eq!(harness.notifier.sent_count(), 1);
}
