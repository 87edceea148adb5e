use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use crate::limit::{Decision, RateLimiter};

use super::document::DocumentRenderer;
use super::domain::{ApplicationId, EnrollmentSubmission, Locale};
use super::notify::NotificationGateway;
use super::repository::{ApplicantRepository, RepositoryError};
use super::service::{EnrollmentError, EnrollmentService};

/// State shared by the public handlers: the pipeline plus the per-surface
/// request budgets.
pub struct PublicRoutes<R, D, N> {
    pub service: Arc<EnrollmentService<R, D, N>>,
    pub enrollment_limiter: RateLimiter,
    pub document_limiter: RateLimiter,
}

/// Router builder exposing the public enrollment surface.
pub fn enrollment_router<R, D, N>(state: Arc<PublicRoutes<R, D, N>>) -> Router
where
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    Router::new()
        .route("/api/enrollment", post(submit_handler::<R, D, N>))
        .route("/api/pdf/:application_id", get(document_handler::<R, D, N>))
        .with_state(state)
}

pub(crate) fn client_key(connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn blocked_response(retry_after_secs: u64) -> Response {
    let payload = json!({
        "error": "too many requests, retry later",
        "retry_after": retry_after_secs,
    });
    (StatusCode::TOO_MANY_REQUESTS, axum::Json(payload)).into_response()
}

fn success_message(locale: Locale) -> &'static str {
    match locale {
        Locale::Fr => "Inscription réussie ! Vous recevrez un email de confirmation.",
        Locale::En => "Enrollment recorded! A confirmation email is on its way.",
        Locale::Ar => "تم التسجيل بنجاح! ستتلقون بريدا إلكترونيا للتأكيد.",
    }
}

pub(crate) async fn submit_handler<R, D, N>(
    State(state): State<Arc<PublicRoutes<R, D, N>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    axum::Json(submission): axum::Json<EnrollmentSubmission>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let key = client_key(connect_info.as_ref());
    if let Decision::Blocked { retry_after_secs } = state.enrollment_limiter.check(&key) {
        return blocked_response(retry_after_secs);
    }

    let locale = submission.locale;
    match state.service.submit(submission) {
        Ok(receipt) => {
            let payload = json!({
                "success": true,
                "application_id": receipt.application_id.0,
                "pdf_url": receipt.document.0,
                "message": success_message(locale),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(EnrollmentError::Validation(err)) => {
            let payload = json!({
                "error": err.to_string(),
                "fields": err.violations,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(EnrollmentError::Age(err)) => {
            let payload = json!({
                "error": err.to_string(),
                "fields": [{ "field": "birth_date", "message": err.to_string() }],
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            error!(error = %other, "enrollment failed");
            opaque_failure()
        }
    }
}

pub(crate) async fn document_handler<R, D, N>(
    State(state): State<Arc<PublicRoutes<R, D, N>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let key = client_key(connect_info.as_ref());
    if let Decision::Blocked { retry_after_secs } = state.document_limiter.check(&key) {
        return blocked_response(retry_after_secs);
    }

    let id = ApplicationId(application_id);
    match state.service.document(&id) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"inscription-{}.pdf\"", id.0),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(EnrollmentError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "application not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            error!(application_id = %id.0, error = %other, "document retrieval failed");
            opaque_failure()
        }
    }
}

fn opaque_failure() -> Response {
    let payload = json!({ "error": "internal error" });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
