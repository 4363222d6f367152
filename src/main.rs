use sheet_translator::{server, AppConfig, AppState};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = AppConfig::load(Some(&config_path))?;

    init_tracing(&config)?;
    tracing::info!(
        chunk_size = config.translation.chunk_size,
        bucket = ?config.storage.bucket,
        notify = config.notify.endpoint.is_some(),
        "Loaded configuration"
    );

    std::fs::create_dir_all(&config.storage.upload_dir)?;
    std::fs::create_dir_all(&config.storage.output_dir)?;

    let state = AppState::from_config(config)?;

    server::serve(state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    tracing::info!("Server shutting down");
    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("sheet_translator={}", config.logging.level))
    })?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
