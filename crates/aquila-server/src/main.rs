use aquila_server::{AppState, config::ServerConfig, create_router, error::Result, logging, metrics};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = ServerConfig::from_env()?;
    logging::init(&config);
    info!(
        "Starting {} {} on {}:{} (log format: {})",
        config.project_name,
        aquila::version(),
        config.host,
        config.port,
        config.log_format
    );

    let metrics_handle = metrics::install_recorder()?;
    let _metrics_server =
        metrics::spawn_metrics_server(&config.host, config.metrics_port, metrics_handle.clone())
            .await?;

    let state = AppState::from_config(&config).await?;
    let app = create_router(state, config.metrics_debug.then_some(metrics_handle));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
