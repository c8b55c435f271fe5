use masa::{AppConfig, AppState};
use masa_core::MasaConfig;

#[tokio::main]
async fn main() {
    masa_core::init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Masa failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = MasaConfig::load("dev")?;
    let app_config: AppConfig = config.bind()?;
    tracing::info!(profile = config.profile(), backend = ?app_config.database.backend, "Configuration loaded");

    let addr = app_config.addr.clone();
    let state = AppState::connect(app_config).await?;
    let monitors = state.monitors.clone();

    masa::serve(masa::router(state), &addr).await?;
    monitors.stop_all();
    Ok(())
}
