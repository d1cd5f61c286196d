// crates/relay-server/src/main.rs

//! Relay hub binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::config::Config;
use relay_server::server;

#[derive(Parser)]
#[clap(name = "relay-server")]
#[clap(about = "Relay hub between chess frontends, robot arms and AI engines")]
struct Cli {
    /// TOML config file (applied before RELAY_* environment variables)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Primary bind address
    #[clap(short, long)]
    bind: Option<String>,

    /// TCP port for robots and AI engines
    #[clap(long)]
    tcp_port: Option<u16>,

    /// WebSocket port for frontends
    #[clap(long)]
    ws_port: Option<u16>,

    /// HTTP command ingress port
    #[clap(long)]
    http_port: Option<u16>,

    /// Disable the HTTP command ingress
    #[clap(long)]
    no_http: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let base = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Config::default(),
        };
        let mut config = base.with_env().context("reading RELAY_* environment")?;

        if let Some(bind) = self.bind {
            config.primary_addr = bind;
        }
        if let Some(port) = self.tcp_port {
            config.tcp_port = port;
        }
        if let Some(port) = self.ws_port {
            config.ws_port = port;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if self.no_http {
            config.http_enabled = false;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config()?;
    info!(
        primary = %config.primary_addr,
        fallback = %config.fallback_addr,
        tcp_port = config.tcp_port,
        ws_port = config.ws_port,
        http_port = config.http_port,
        http_enabled = config.http_enabled,
        "starting relay-server"
    );

    server::run(config).await.context("relay hub failed")?;
    Ok(())
}
