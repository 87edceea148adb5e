use innovision::workflows::enrollment::{
    Applicant, NotificationError, NotificationGateway, SmtpNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Concrete notifier selected at startup: a real SMTP relay when credentials
/// are configured, otherwise a log-only fallback so development deployments
/// still complete the pipeline.
pub(crate) enum ApiNotifier {
    Smtp(SmtpNotifier),
    LogOnly,
}

impl NotificationGateway for ApiNotifier {
    fn send_confirmation(
        &self,
        applicant: &Applicant,
        document: &[u8],
    ) -> Result<(), NotificationError> {
        match self {
            ApiNotifier::Smtp(notifier) => notifier.send_confirmation(applicant, document),
            ApiNotifier::LogOnly => {
                info!(
                    application_id = %applicant.application_id.0,
                    recipient = %applicant.email,
                    bytes = document.len(),
                    "smtp disabled; confirmation email logged instead of sent"
                );
                Ok(())
            }
        }
    }
}
