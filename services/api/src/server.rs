use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingChangeNotifier};
use crate::routes::with_decision_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use openconsent::config::AppConfig;
use openconsent::decisions::{
    DecisionRepository, DecisionService, InMemoryDecisionRepository, JsonFileDecisionRepository,
};
use openconsent::error::AppError;
use openconsent::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data) = args.data.take() {
        config.storage.data_path = Some(data);
    }

    telemetry::init(&config.telemetry, config.environment)?;

    match config.storage.data_path.clone() {
        Some(path) => {
            let repository = Arc::new(JsonFileDecisionRepository::open(&path)?);
            info!(path = %path.display(), "using json decision store");
            serve(config, repository).await
        }
        None => {
            info!("using in-memory decision store");
            serve(config, Arc::new(InMemoryDecisionRepository::new())).await
        }
    }
}

async fn serve<R>(config: AppConfig, repository: Arc<R>) -> Result<(), AppError>
where
    R: DecisionRepository + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let notifier = Arc::new(LoggingChangeNotifier);
    let decision_service =
        Arc::new(DecisionService::new(repository, notifier).with_chart(config.chart));

    let app = with_decision_routes(decision_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "openconsent ready");

    axum::serve(listener, app).await?;
    Ok(())
}
