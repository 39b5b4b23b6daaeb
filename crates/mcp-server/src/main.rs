//! TCP relay server between MCP clients and the Fusion 360 host.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use mcp_server::config::Config;
use mcp_server::server;

/// Relay JSON commands between clients and the Fusion 360 host.
#[derive(Parser, Debug)]
#[command(name = "mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Interface to bind to (overrides config and MCP_BIND_ADDR)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config and MCP_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => config_level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(host) = args.host {
        config.bind_addr = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(log_level(args.verbose, args.quiet, &config.log_level));

    info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        llm_configured = config.llm.api_key.is_some(),
        "starting mcp-server"
    );

    server::run(config).await.context("server failed")?;
    Ok(())
}
