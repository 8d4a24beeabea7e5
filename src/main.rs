//! This project is split in 2 main modules:
//!
//! - [payment] (the `POST /payment` API surface)
//! - [gateway] (CamPay mobile money client)
#![doc = include_str!("../README.md")]

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use anyhow::Context;
use axum::Router;
use tracing_subscriber::EnvFilter;

mod config;
/// CamPay integration implementation
///
/// This module defines the types and methods to request mobile money collections from CamPay.
mod gateway;
/// Implementation of the payment route
///
/// This module validates caller requests and maps gateway results into responses.
mod payment;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env file"),
        Err(e) => tracing::warn!("Failed to load environment variables from .env: {e}"),
    };
    let config = config::Config::from_env().context("load configuration")?;
    tracing::info!(environment = %config.gateway.environment, "Using CamPay environment");

    let gateway =
        gateway::CamPayGateway::new(config.gateway).context("build gateway http client")?;
    let state = state::AppState::new(Arc::new(gateway));

    let app = Router::new()
        .merge(payment::api::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let listener =
        tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port))
            .await
            .with_context(|| format!("bind port {}", config.port))?;

    tracing::info!("Serving on port {}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serve http")?;
    Ok(())
}
