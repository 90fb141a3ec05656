//! Profile Pool CLI
//!
//! Starts the profile pool HTTP server.

use anyhow::Context;
use profilepool_server::{config::ServerConfig, start_server};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let mut config = if args.len() > 2 && args[1] == "--config" {
        let config_path = &args[2];
        ServerConfig::from_file(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        return Ok(());
    } else {
        tracing::info!("No config file specified, using defaults");
        ServerConfig::default()
    };

    config
        .apply_env()
        .context("Invalid environment override")?;

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Profile Pool - Shared credential pool with exclusive check-out");
    println!();
    println!("USAGE:");
    println!("    profilepool [--config <path-to-config.toml>]");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address: IP address to bind (default: '0.0.0.0')");
    println!("    - bind_port: Port number (default: 8080)");
    println!("    - database: SQLite file path or ':memory:' (default: 'profilepool.db')");
    println!("    - [sweeper] unlock_timeout_ms: Lock staleness threshold (default: 600000)");
    println!("    - [sweeper] sweep_interval_ms: Time between sweeps (default: 60000)");
    println!();
    println!("ENVIRONMENT:");
    println!("    PROFILEPOOL_PORT, PROFILEPOOL_DATABASE, PROFILEPOOL_UNLOCK_TIMEOUT_MS");
    println!("    override the matching settings. RUST_LOG sets the log filter.");
    println!();
}
