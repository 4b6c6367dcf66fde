//! PHOS Digitizer (phos-digitizer) - Main entry point
//!
//! Reads summable digits of a signal input plus any mixed background
//! inputs, digitizes every event and stores the digits under one named
//! output in SQLite (or in memory for a dry run).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use phos_common::config::resolve_config_path;
use phos_common::DigitizerConfig;
use phos_digitizer::{InputSource, MemorySink, RunInputs, SessionBuilder, SqliteSink};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Level used until the configuration is loaded
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for phos-digitizer
#[derive(Parser, Debug)]
#[command(name = "phos-digitizer")]
#[command(about = "Digitizer for the PHOS calorimeter: summable digits to digits")]
#[command(version)]
struct Args {
    /// Signal input (summable digits, JSON)
    input: PathBuf,

    /// Background input mixed into every event (repeatable)
    #[arg(short, long = "mix-with")]
    mix_with: Vec<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database receiving the digits
    #[arg(short, long, env = "PHOS_DIGITIZER_DATABASE")]
    database: Option<PathBuf>,

    /// Name of the digit output
    #[arg(short, long)]
    output_name: Option<String>,

    /// Noise generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Keep digits in memory instead of writing the database
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Log filter (overrides RUST_LOG and the configured level)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before anything logs; the configured level is
    // applied once the configuration is loaded
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, overridden) = initial_filter(args.log_level.as_deref(), rust_log.as_deref())?;
    let (filter, filter_handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting PHOS digitizer (git {}, built {}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = DigitizerConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if !overridden {
        let configured = EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?;
        filter_handle
            .reload(configured)
            .context("Failed to apply configured log level")?;
    }

    match resolve_config_path(args.config.as_deref()) {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        _ => info!("Configuration: built-in defaults"),
    }

    if let Some(name) = args.output_name {
        config.output_name = name;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.database.is_some() {
        config.database_path = args.database;
    }
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        let text = toml::to_string_pretty(&config).context("Failed to render configuration")?;
        println!("{}", text);
        return Ok(());
    }

    info!(
        "Output '{}': {} classes, {} channels",
        config.output_name,
        config.classes.len(),
        config.total_channels()
    );

    let mut inputs = RunInputs::new(
        InputSource::load(&args.input)
            .with_context(|| format!("Failed to load input {}", args.input.display()))?,
    );
    for path in &args.mix_with {
        let source = InputSource::load(path)
            .with_context(|| format!("Failed to load input {}", path.display()))?;
        inputs.mix_with(source);
    }

    let builder = SessionBuilder::from_config(&config).context("Failed to configure session")?;
    let builder = match (&config.database_path, args.dry_run) {
        (Some(path), false) => {
            info!("Writing digits to {}", path.display());
            let sink = SqliteSink::open(path)
                .await
                .context("Failed to open digit database")?;
            builder.sink(sink)
        }
        (None, false) => {
            warn!("No database configured, digits are kept in memory only");
            builder.sink(MemorySink::new())
        }
        (_, true) => {
            info!("Dry run, digits are kept in memory only");
            builder.sink(MemorySink::new())
        }
    };
    let mut session = builder.build().context("Failed to build session")?;

    tokio::select! {
        result = session.run(&inputs) => {
            let summary = result.context("Digitization failed")?;
            if !summary.failed.is_empty() {
                error!("Events not digitized: {:?}", summary.failed);
            }
            info!(
                "Done: {}/{} events stored, {} digits",
                summary.stored,
                summary.events,
                summary.digits_in_run
            );
        }
        _ = shutdown_signal() => {
            warn!(
                "Interrupted after {} digits; events stored so far remain valid",
                session.digits_in_run()
            );
        }
    }

    Ok(())
}

/// Log filter usable before the configuration is loaded
///
/// `--log-level` wins over `RUST_LOG`. The flag is true when either was
/// given, so the configured level must not replace the filter later.
fn initial_filter(log_level: Option<&str>, rust_log: Option<&str>) -> Result<(EnvFilter, bool)> {
    if let Some(level) = log_level {
        let filter = EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter '{}'", level))?;
        return Ok((filter, true));
    }
    match rust_log.and_then(|value| EnvFilter::try_new(value).ok()) {
        Some(filter) => Ok((filter, true)),
        None => Ok((EnvFilter::new(DEFAULT_LOG_LEVEL), false)),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping");
        },
    }
}
