use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use backup_report::db::{self, PgUserProvider};
use backup_report::license::HttpLicenseServiceProvider;
use backup_report::pipeline::ReportAssembler;
use backup_report::routes::{request_timeout, router};
use backup_report::telemetry::init_telemetry;
use backup_report::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        retry.attempts = config.retry.attempts,
        retry.interval_ms = config.retry.interval_ms,
        "Starting backup-report"
    );

    let pool = db::create_pool(&config.database_url).await?;

    let assembler = ReportAssembler::new(
        Arc::new(PgUserProvider::new(pool)),
        Arc::new(HttpLicenseServiceProvider::new(&config.license_service_url)),
        config.license_timeout(),
        config.retry.clone(),
    );

    let shutdown = CancellationToken::new();

    let state = AppState {
        assembler: Arc::new(assembler),
        shutdown: shutdown.clone(),
        request_timeout: request_timeout(
            config.retry.attempts,
            config.retry.interval(),
            config.license_timeout(),
        ),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
