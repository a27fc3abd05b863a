//! Daemon entry point for the Firestore MCP server.
//!
//! Loads configuration from flags and the environment, initializes the
//! Firestore client, and serves the MCP protocol over stdio and/or HTTP.

mod bootstrap;
mod config;

use std::error::Error;

use firestore_core::control::FirestoreControlPlane;
use firestore_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bootstrap::build_context;
use crate::config::FirestoreMcpConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = FirestoreMcpConfig::from_args()?;
    init_tracing(&config.log_filter)?;
    info!(
        stdio = config.enable_stdio,
        http = config.enable_http,
        in_memory = config.in_memory,
        "starting firestore-mcpd"
    );

    let context = build_context(&config).await;
    let control = FirestoreControlPlane::new(context);

    let http = config.enable_http.then(|| {
        let http_config = McpHttpServerConfig::new(config.mcp_http_addr);
        tokio::spawn(serve_streamable_http(control.clone(), http_config))
    });

    if config.enable_stdio {
        serve_stdio(control).await?;
        info!("stdio client disconnected");
    }
    if let Some(handle) = http {
        handle.await??;
    }
    Ok(())
}

/// Logs go to stderr; stdout carries the MCP stdio transport.
fn init_tracing(filter: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
}
