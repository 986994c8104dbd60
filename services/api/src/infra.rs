use metrics_exporter_prometheus::PrometheusHandle;
use openconsent::decisions::{ChangeNotifier, DecisionChange, NotifyError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Publishes watcher notifications to the log until a mail transport is wired in.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingChangeNotifier;

impl ChangeNotifier for LoggingChangeNotifier {
    fn notify(&self, change: DecisionChange) -> Result<(), NotifyError> {
        for recipient in &change.recipients {
            info!(
                decision_id = %change.decision_id,
                status = %change.status,
                editor = %change.editor,
                recipient = %recipient,
                "notify watcher: {}",
                change.short_name
            );
        }
        Ok(())
    }
}
