//! Field booking service: CLI server
//!
//! ```sh
//! # Run with default config (~/.config/field-booking/config.toml)
//! field-booking
//!
//! # Custom config path (or FIELD_BOOKING_CONFIG)
//! field-booking --config /etc/field-booking/config.toml
//!
//! # Override the listen port
//! field-booking --port 8081
//!
//! # Validate config without starting
//! field-booking --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use field_booking::config::AppConfig;
use field_booking::server::{init_tracing, ServerHandle, ServerOptions};

/// Sports field booking and VNPay payment service.
#[derive(Parser, Debug)]
#[command(
    name = "field-booking",
    version,
    about = "Sports field booking service with VNPay payments",
    long_about = "REST API for booking sports fields by the hour and paying \
                  in cash or through the VNPay hosted checkout.\n\n\
                  Default config: ~/.config/field-booking/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the database URL.
    #[arg(long)]
    database_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(field_booking::default_config_path);

    let loaded = if config_path.exists() {
        AppConfig::load(&config_path).map(Some)
    } else {
        Ok(None)
    };

    let mut config = match loaded {
        Ok(cfg) => cfg.unwrap_or_default(),
        Err(e) if cli.check => {
            eprintln!("Invalid configuration in {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
            return run(cli, AppConfig::default()).await;
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref url) = cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if let Err(e) = config.validate() {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", config.database.url);
        println!("   Log level   : {}", config.logging.level);
        let missing = config.gateway.missing_settings();
        if missing.is_empty() {
            println!("   VNPay       : configured");
        } else {
            println!("   VNPay       : missing {}", missing.join(", "));
        }
        return ExitCode::SUCCESS;
    }

    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());
    run(cli, config).await
}

async fn run(cli: Cli, config: AppConfig) -> ExitCode {
    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;
    ExitCode::SUCCESS
}
