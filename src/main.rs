#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use recwatch::cli::{Cli, dispatch};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    // Both reqwest and tokio-tungstenite pull in rustls; pin the process-level provider once.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Initialize logging (RUST_LOG wins, info otherwise)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dispatch(Cli::parse()).await
}
