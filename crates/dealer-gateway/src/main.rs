//! `dealer-gateway` binary entry point.

#![deny(unsafe_code)]
#![warn(clippy::all)]

use dealer_telemetry::{setup_logging, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging(&LogConfig::new("info").with_directive("dealer_gateway=info"))
        .map_err(|err| anyhow::anyhow!(err))?;

    let config = dealer_config::Config::from_env()?;

    dealer_gateway::server::run(config).await
}
