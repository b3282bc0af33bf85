use agentdeck::{api, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agentdeck=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Starting agentdeck on port {} (data dir: {})",
        config.port,
        config.data_dir.display()
    );

    api::serve(config).await
}
