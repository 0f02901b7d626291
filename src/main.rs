mod config;
mod guard;
mod library;
mod playlist;
mod tags;
mod tools;
mod types;

use clap::Parser;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries the MCP transport, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = config::Config::from_cli(config::Cli::parse());
    if !config.root_is_dir() {
        tracing::warn!(
            root = %config.root().display(),
            "library root is not a directory; path checks and playlist writes will fail"
        );
    }
    tracing::info!(root = %config.root().display(), "starting playlister");

    let server = tools::PlaylisterServer::new(config);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
