// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scrubwerk — Remote Secure-Erase Agent
//
// Entry point. Initialises logging, loads configuration, wires backend
// services, and serves the control API until interrupted.

mod data_dir;
mod server;
mod services;

use tracing::{error, info, warn};

use scrubwerk_core::error::Result;

use server::AgentServer;
use services::AgentServices;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Scrubwerk agent starting");

    if let Err(e) = run().await {
        error!(error = %e, "agent failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let data_dir = data_dir::data_dir();
    info!(path = %data_dir.display(), "data directory");

    let config = services::load_or_create_config(&data_dir);
    if config.api_key == "admin" {
        warn!("API key is the well-known default; set a real key in config.json");
    }
    let port = config.port;

    let services = AgentServices::init(config, data_dir)?;
    info!(
        public_key = %services.signer().public_key_hex(),
        "attestation key loaded"
    );

    let mut server = AgentServer::new(port);
    server.start(services).await?;

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    server.stop().await?;
    Ok(())
}
