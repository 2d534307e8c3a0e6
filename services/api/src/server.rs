use crate::cli::ServeArgs;
use crate::infra::{in_memory_deps, AppState};
use crate::routes::service_router;
use crate::seed::seed_accounts;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lifelink::config::{AppConfig, AppEnvironment};
use lifelink::error::AppError;
use lifelink::telemetry;
use lifelink::workflows::{WorkflowError, WorkflowState};
use std::sync::atomic::{AtomicBool, Ordering};
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let workflow_state = WorkflowState::new(in_memory_deps(&config.workflow), &config.workflow);
    if args.seed {
        if config.environment == AppEnvironment::Production {
            return Err(WorkflowError::forbidden("--seed is not available in production").into());
        }
        for seeded in seed_accounts(&workflow_state).await? {
            info!(
                account = %seeded.account.id,
                role = %seeded.account.role(),
                email = %seeded.account.email,
                "seeded account"
            );
            println!(
                "{:<8} {:<24} {}",
                seeded.account.role().label(),
                seeded.account.email,
                seeded.bearer
            );
        }
    }
    let app = service_router(workflow_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        blob_dir = %config.workflow.blob_dir.display(),
        "lifelink workflow service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
