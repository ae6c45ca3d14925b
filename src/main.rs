use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shrike::cli;
use shrike::node::Node;
use shrike::transport::UdpTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shrike=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let args = cli::Cli::parse();
    let settings = args.into_settings()?;

    // One socket for the whole protocol, broadcast-capable
    let transport = Arc::new(UdpTransport::bind(settings.listen_port).await?);
    info!(
        "Starting {} {} as node {} ('{}') on port {}",
        cli::APP_NAME,
        cli::APP_VERSION,
        settings.node_id,
        settings.node_name,
        settings.listen_port
    );

    let mut node = Node::new(settings, transport);
    node.run().await?;

    Ok(())
}
