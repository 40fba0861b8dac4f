//! Startup sequencing: build state, bind the listener, spawn the
//! janitor, serve.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use dealer_config::Config;
use tokio::net::TcpListener;
use tracing::info;

use crate::state::AppState;
use crate::{janitor, router};

/// Run the gateway until the process is signaled to stop. Binding
/// failure is fatal (spec §7: "inability to bind the listening socket at
/// startup" causes process exit with a non-zero status), so this
/// propagates the error for `main` to turn into an exit code.
pub async fn run(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port: {}:{}", config.host, config.port))?;

    let state = AppState::new(config);
    let _janitor = janitor::spawn(state.clone());

    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "dealer-gateway listening");

    axum::serve(listener, app)
        .await
        .context("server loop exited with an error")?;

    Ok(())
}
