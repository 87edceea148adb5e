use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::limit::{Decision, RateLimiter};
use crate::workflows::enrollment::router::client_key;
use crate::workflows::enrollment::{
    AgeBand, ApplicantId, ApplicantQuery, ApplicantRepository, DocumentRenderer,
    EnrollmentError, NotificationError, NotificationGateway, RepositoryError, SortField,
    SortOrder, DEFAULT_PAGE_SIZE,
};

use super::auth::AuthError;
use super::repository::AdminDirectory;
use super::service::{AdminError, AdminService};

const MAX_PAGE_SIZE: usize = 100;

/// State shared by the admin handlers: the gated service plus the surface's
/// request budget.
pub struct AdminRoutes<A, R, D, N> {
    pub service: Arc<AdminService<A, R, D, N>>,
    pub limiter: RateLimiter,
}

/// Router builder exposing the authenticated dashboard endpoints.
pub fn admin_router<A, R, D, N>(state: Arc<AdminRoutes<A, R, D, N>>) -> Router
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    Router::new()
        .route("/api/admin/login", post(login_handler::<A, R, D, N>))
        .route("/api/admin/logout", post(logout_handler::<A, R, D, N>))
        .route("/api/admin/me", get(me_handler::<A, R, D, N>))
        .route("/api/admin/applicants", get(list_handler::<A, R, D, N>))
        .route("/api/admin/stats", get(stats_handler::<A, R, D, N>))
        .route(
            "/api/admin/applicants/:id/resend-email",
            post(resend_handler::<A, R, D, N>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

/// Query-string filters as the dashboard sends them, converted into the
/// typed store query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListParams {
    search: Option<String>,
    wilaya: Option<String>,
    course: Option<String>,
    age_group: Option<AgeBand>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    limit: Option<usize>,
    offset: Option<usize>,
    sort_by: Option<SortField>,
    sort_order: Option<SortOrder>,
}

impl ListParams {
    fn into_query(self) -> ApplicantQuery {
        ApplicantQuery {
            search: self.search.filter(|value| !value.trim().is_empty()),
            wilaya: self.wilaya.filter(|value| !value.trim().is_empty()),
            course: self.course.filter(|value| !value.trim().is_empty()),
            age_band: self.age_group,
            created_from: self.date_from,
            created_to: self.date_to,
            sort_field: self.sort_by.unwrap_or(SortField::CreatedAt),
            sort_order: self.sort_order.unwrap_or(SortOrder::Desc),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn admin_failure(err: AdminError) -> Response {
    match err {
        AdminError::Auth(AuthError::Throttled { retry_after_secs }) => {
            let payload = json!({
                "error": "too many failed login attempts, retry later",
                "retry_after": retry_after_secs,
            });
            (StatusCode::TOO_MANY_REQUESTS, axum::Json(payload)).into_response()
        }
        AdminError::Auth(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        AdminError::Repository(RepositoryError::NotFound)
        | AdminError::Enrollment(EnrollmentError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "applicant not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        AdminError::Enrollment(EnrollmentError::Notification(NotificationError::Transport(_))) => {
            let payload = json!({ "error": "email delivery failed" });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "admin operation failed");
            let payload = json!({ "error": "internal error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn login_handler<A, R, D, N>(
    State(state): State<Arc<AdminRoutes<A, R, D, N>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let key = client_key(connect_info.as_ref());
    if let Decision::Blocked { retry_after_secs } = state.limiter.check(&key) {
        return admin_failure(AdminError::Auth(AuthError::Throttled { retry_after_secs }));
    }

    match state.service.login(&request.email, &request.password, &key) {
        Ok(session) => {
            let payload = json!({
                "success": true,
                "token": session.token.0,
                "expires_at": session.expires_at,
                "user": session.admin,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => admin_failure(err),
    }
}

pub(crate) async fn logout_handler<A, R, D, N>(
    State(state): State<Arc<AdminRoutes<A, R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let token = bearer_token(&headers);
    state.service.logout(token.as_deref());
    (StatusCode::OK, axum::Json(json!({ "success": true }))).into_response()
}

pub(crate) async fn me_handler<A, R, D, N>(
    State(state): State<Arc<AdminRoutes<A, R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let token = bearer_token(&headers);
    match state.service.identity(token.as_deref()) {
        Ok(identity) => (StatusCode::OK, axum::Json(identity)).into_response(),
        Err(err) => admin_failure(err),
    }
}

pub(crate) async fn list_handler<A, R, D, N>(
    State(state): State<Arc<AdminRoutes<A, R, D, N>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let key = client_key(connect_info.as_ref());
    if let Decision::Blocked { retry_after_secs } = state.limiter.check(&key) {
        return admin_failure(AdminError::Auth(AuthError::Throttled { retry_after_secs }));
    }

    let token = bearer_token(&headers);
    match state.service.list(token.as_deref(), &params.into_query()) {
        Ok(page) => {
            let applicants: Vec<_> = page
                .applicants
                .iter()
                .map(|record| record.summary_view())
                .collect();
            let payload = json!({
                "applicants": applicants,
                "total": page.total,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => admin_failure(err),
    }
}

pub(crate) async fn stats_handler<A, R, D, N>(
    State(state): State<Arc<AdminRoutes<A, R, D, N>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let key = client_key(connect_info.as_ref());
    if let Decision::Blocked { retry_after_secs } = state.limiter.check(&key) {
        return admin_failure(AdminError::Auth(AuthError::Throttled { retry_after_secs }));
    }

    let token = bearer_token(&headers);
    match state.service.stats(token.as_deref()) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => admin_failure(err),
    }
}

pub(crate) async fn resend_handler<A, R, D, N>(
    State(state): State<Arc<AdminRoutes<A, R, D, N>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    A: AdminDirectory + 'static,
    R: ApplicantRepository + 'static,
    D: DocumentRenderer + 'static,
    N: NotificationGateway + 'static,
{
    let key = client_key(connect_info.as_ref());
    if let Decision::Blocked { retry_after_secs } = state.limiter.check(&key) {
        return admin_failure(AdminError::Auth(AuthError::Throttled { retry_after_secs }));
    }

    let token = bearer_token(&headers);
    let Ok(applicant_id) = id.parse::<Uuid>().map(ApplicantId) else {
        let payload = json!({ "error": "applicant not found" });
        return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
    };

    match state.service.resend(token.as_deref(), &applicant_id) {
        Ok(record) => {
            let payload = json!({
                "success": true,
                "applicant": record.summary_view(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => admin_failure(err),
    }
}
