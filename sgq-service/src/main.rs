use service_core::observability::{init_metrics, init_tracing};
use sgq_service::config::SgqConfig;
use sgq_service::startup::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SgqConfig::load()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.database.backend,
        "Starting service"
    );

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    tracing::info!("Service stopped");
    Ok(())
}
