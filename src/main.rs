use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_availability::config::Config;
use fleet_availability::coordinator::{AvailabilityServer, LockError, ReservationCoordinator};
use fleet_availability::error::{Error, FleetErrorTrait};
use fleet_availability::models::{parse_date, ResourceId};
use fleet_availability::registry::{RegistryClient, RegistryClientConfig};
use fleet_availability::storage;
use fleet_availability::utils::retry::{with_retry_if, RetryConfig};

#[derive(Parser)]
#[command(
    name = "fleet-availability",
    version,
    about = "Vehicle availability and schedule locking service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format; overrides the config file
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the bind address
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Check whether a vehicle is free on a date
    Check {
        /// Vehicle identifier in the registry
        #[arg(long)]
        vehicle_id: i64,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
    },

    /// Lock a vehicle for a date
    Lock {
        /// Vehicle identifier in the registry
        #[arg(long)]
        vehicle_id: i64,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Requester identifier
        #[arg(short, long)]
        user_id: String,

        /// Retries for transient failures (registry unreachable, storage)
        #[arg(long, default_value = "0")]
        retries: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format.as_str().to_string();
    }

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    let outcome = match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            tracing::info!(
                bind_address = %config.server.bind_address,
                registry = %config.registry.url,
                database = %config.database.sqlite_path.display(),
                "Starting serve command"
            );
            return serve(&config).await;
        }

        Commands::Check { vehicle_id, date } => {
            tracing::info!(vehicle_id = %vehicle_id, date = %date, "Starting check command");
            check(&config, vehicle_id, &date).await
        }

        Commands::Lock {
            vehicle_id,
            date,
            user_id,
            retries,
        } => {
            tracing::info!(
                vehicle_id = %vehicle_id,
                date = %date,
                user_id = %user_id,
                retries = %retries,
                "Starting lock command"
            );
            lock(&config, vehicle_id, &date, &user_id, retries).await
        }
    };

    if let Err(e) = &outcome {
        tracing::error!(
            category = e.category().as_str(),
            recoverable = e.is_recoverable(),
            error = %e,
            "Command failed"
        );
    }
    Ok(outcome?)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("fleet_availability=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("fleet_availability={level},warn"))
        })
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize tracing")?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize tracing")?;
        }
    }

    Ok(())
}

fn build_coordinator(config: &Config) -> fleet_availability::Result<ReservationCoordinator> {
    let repo = storage::open_repository(&config.database)?;
    let registry = RegistryClient::new(RegistryClientConfig::from(&config.registry))?;
    Ok(ReservationCoordinator::new(repo, Arc::new(registry)))
}

fn parse_cli_date(raw: &str) -> fleet_availability::Result<NaiveDate> {
    parse_date(raw)
        .map_err(|e| Error::with_source(format!("Invalid date: {raw}. Expected YYYY-MM-DD"), e))
}

async fn serve(config: &Config) -> Result<()> {
    let server = AvailabilityServer::from_config(config)?;
    println!("{}", server.info().display());
    server.start().await?;
    Ok(())
}

async fn check(config: &Config, vehicle_id: i64, date: &str) -> fleet_availability::Result<()> {
    let date = parse_cli_date(date)?;
    let coordinator = build_coordinator(config)?;

    let available = coordinator
        .availability()
        .check(ResourceId(vehicle_id), date)
        .await?;

    println!(
        "Vehicle {vehicle_id} on {date}: {}",
        if available { "available" } else { "locked" }
    );
    Ok(())
}

async fn lock(
    config: &Config,
    vehicle_id: i64,
    date: &str,
    user_id: &str,
    retries: u32,
) -> fleet_availability::Result<()> {
    let date = parse_cli_date(date)?;
    let coordinator = build_coordinator(config)?;

    let reservation = with_retry_if(
        &RetryConfig::new(retries),
        || coordinator.lock(ResourceId(vehicle_id), date, user_id),
        |e: &LockError| FleetErrorTrait::is_recoverable(e),
    )
    .await?;

    println!("Schedule locked");
    println!("  Reservation: {}", reservation.id);
    println!("  Vehicle: {}", reservation.resource_id);
    println!("  Date: {}", reservation.date);
    println!("  Requester: {}", reservation.requester_id);
    Ok(())
}
