use crate::cli::ServeArgs;
use crate::infra::{build_store, verify_notifier, AppState};
use crate::routes::with_requirement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use requirement_alert::config::AppConfig;
use requirement_alert::error::AppError;
use requirement_alert::notify::SmtpNotifier;
use requirement_alert::telemetry;
use requirement_alert::workflows::requirements::RequirementIntakeService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(shops) = args.shops.take() {
        config.intake.shops_seed_file = Some(shops);
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(build_store(config.intake.shops_seed_file.as_deref())?);
    let notifier = Arc::new(SmtpNotifier::new(config.require_mail()?)?);
    // Failure is logged inside; startup continues.
    verify_notifier(notifier.clone()).await.ok();

    let intake_service = Arc::new(RequirementIntakeService::new(
        store,
        notifier,
        config.intake.dispatch_policy,
    ));

    let app = with_requirement_routes(intake_service.clone())
        .layer(Extension(app_state))
        .layer(CorsLayer::permissive())
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        dispatch_policy = intake_service.policy().label(),
        "requirement intake service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await?;

    info!("requirement intake service stopped");
    Ok(())
}

pub(crate) async fn verify_mail() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let notifier = Arc::new(SmtpNotifier::new(config.require_mail()?)?);
    verify_notifier(notifier).await
}

async fn shutdown_signal(readiness: Arc<std::sync::atomic::AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown signal received, draining connections");
}
