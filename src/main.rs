use anyhow::Context;
use tracing_subscriber::EnvFilter;

use hijack_relay::config::{Config, Mode};
use hijack_relay::proxy::Forwarder;
use hijack_relay::server::{Origin, Server, ServerHandle, ServerOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load().context("invalid configuration")?;
    let options = ServerOptions::from(&cfg.timeouts);

    let handle = start(&cfg, options).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    handle.stop().await
}

async fn start(cfg: &Config, options: ServerOptions) -> anyhow::Result<ServerHandle> {
    match cfg.mode {
        Mode::Server => {
            tracing::info!("Server running on {}...", cfg.listen_addr);
            Server::bind(&cfg.listen_addr, Origin, options).await?.start()
        }
        Mode::Proxy => {
            tracing::info!(
                target_addr = %cfg.target,
                "Proxy running on {}...",
                cfg.listen_addr
            );
            let forwarder = Forwarder::new(cfg.target.as_str(), cfg.timeouts);
            Server::bind(&cfg.listen_addr, forwarder, options).await?.start()
        }
    }
}
