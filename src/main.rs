/// Spray bridge service.
///
/// Single process, single device: camera frames in, diagnosis and dose out,
/// commands queued for the device's next poll.

use spray_bridge::config::Config;
use spray_bridge::error::AppError;
use spray_bridge::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("spray_bridge=info,tower_http=debug")),
        )
        .init();

    eprintln!("[STARTUP] Spray bridge starting...");

    // Inference is CPU-bound and runs on the blocking pool; one device never
    // needs more than a handful of those.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .max_blocking_threads(16)
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build runtime: {e}")))?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), AppError> {
    let config = Config::from_env();
    info!("Model path: {}", config.model_path.display());
    info!("Dosage table: {}", config.dosage_csv_path.display());
    info!("Liveness threshold: {:?}", config.liveness_threshold);
    info!("Container volume: {} ml", config.container_volume_ml);

    let pipeline = match spray_bridge::build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("[STARTUP ERROR] {e}");
            return Err(e);
        }
    };

    let port = config.port;
    let state = Arc::new(AppState::new(pipeline, config));
    let app = spray_bridge::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] Server ready! Listening on http://{}", addr);
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    eprintln!("[SHUTDOWN] Server stopped");
    Ok(())
}
