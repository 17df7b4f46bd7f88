// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! FloodHub - Flood Early-Warning Decision Hub

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use floodhub::{Config, Engine, NAME, VERSION};

/// FloodHub - Flood Early-Warning Decision Hub
#[derive(Parser, Debug)]
#[command(name = "floodhub")]
#[command(author = "FloodHub Project")]
#[command(version = VERSION)]
#[command(about = "Flood early-warning decision hub for field sensor units")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long)]
    broker: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    port: Option<u16>,

    /// Database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run without persisting anything
    #[arg(long)]
    no_db: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} - Flood Early-Warning Decision Hub", NAME, VERSION);

    // Override with command line args
    if let Some(broker) = args.broker {
        config.mqtt.host = broker;
    }
    if let Some(port) = args.port {
        config.mqtt.port = port;
    }
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if args.no_db {
        config.database.enabled = false;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Broker: {}:{}", config.mqtt.host, config.mqtt.port);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(Engine::new(config).run())?;

    info!("{} shutdown complete", NAME);
    Ok(())
}
