use crate::cli::ServeArgs;
use crate::infra::{ApiNotifier, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use innovision::config::AppConfig;
use innovision::error::AppError;
use innovision::limit::{Clock, InMemoryCounterStore, RateLimiter, SystemClock};
use innovision::telemetry;
use innovision::workflows::admin::{
    admin_router, AdminDirectory, AdminId, AdminRoutes, AdminService, AdminUser, AuthService,
    InMemoryAdminDirectory, DEFAULT_ADMIN_ROLE,
};
use innovision::workflows::enrollment::{
    enrollment_router, ConfirmationPdfRenderer, EnrollmentService, InMemoryApplicantRepository,
    PublicRoutes, SmtpNotifier,
};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository = Arc::new(InMemoryApplicantRepository::default());
    let renderer = Arc::new(ConfirmationPdfRenderer::new(config.school.clone()));
    let notifier = Arc::new(if config.smtp.has_credentials() {
        ApiNotifier::Smtp(
            SmtpNotifier::from_config(&config.smtp, config.school.clone())
                .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?,
        )
    } else {
        warn!("SMTP credentials missing; confirmation emails will only be logged");
        ApiNotifier::LogOnly
    });
    let enrollment = Arc::new(EnrollmentService::new(
        repository.clone(),
        renderer,
        notifier,
        clock.clone(),
    ));

    let directory = Arc::new(InMemoryAdminDirectory::default());
    match &config.admin_seed {
        Some(seed) => {
            directory
                .insert(AdminUser {
                    id: AdminId::generate(),
                    email: seed.email.clone(),
                    password_hash: seed.password_hash.clone(),
                    role: DEFAULT_ADMIN_ROLE.to_string(),
                    created_at: clock.now(),
                })
                .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?;
            info!(email = %seed.email, "administrator seeded from environment");
        }
        None => {
            warn!("no administrator seeded; the admin API will reject all logins");
        }
    }
    let auth = Arc::new(AuthService::new(
        directory,
        clock.clone(),
        config.sessions.max_age_secs,
    ));
    let admin_service = Arc::new(AdminService::new(
        auth,
        repository,
        enrollment.clone(),
        clock.clone(),
    ));

    let counters = Arc::new(InMemoryCounterStore::default());
    let public_routes = Arc::new(PublicRoutes {
        service: enrollment,
        enrollment_limiter: RateLimiter::new(
            "enrollment",
            config.limits.enrollment,
            counters.clone(),
            clock.clone(),
        ),
        document_limiter: RateLimiter::new(
            "pdf",
            config.limits.document,
            counters.clone(),
            clock.clone(),
        ),
    });
    let admin_routes = Arc::new(AdminRoutes {
        service: admin_service,
        limiter: RateLimiter::new("admin", config.limits.admin, counters, clock),
    });

    let app = with_service_routes(enrollment_router(public_routes), admin_router(admin_routes))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "enrollment service ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
