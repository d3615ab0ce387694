//! Legacy charset demo server.
//!
//! Serves a single route behind the charset middleware. Clients sending
//! `Accept-Charset: gb2312` get their form fields decoded and the response
//! transcoded; everyone else is passed through.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use legacy_charset::config::{load_config, override_bind_address, AppConfig};
use legacy_charset::observability::{logging, metrics};
use legacy_charset::HttpServer;

#[derive(Parser)]
#[command(name = "legacy-charset")]
#[command(about = "Demo server for the legacy charset middleware", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address (e.g. 127.0.0.1:3000).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let config = override_bind_address(config, cli.bind)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!("legacy-charset v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        header = %config.charset.header_name,
        charset = %config.charset.charset,
        encoding = %config.charset.encoding_label(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
