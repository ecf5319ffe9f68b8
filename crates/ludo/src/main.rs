use ludo::{LudoError, LudoServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), LudoError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        bind_addr = %config.bind_addr,
        max_join_attempts = config.max_join_attempts,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        "starting Ludo server"
    );

    let server = LudoServer::builder().config(config).build().await?;
    server.run().await
}
