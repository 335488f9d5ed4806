//! Pulse CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_aggregator::{AggregatorConfig, HealthAggregator, SignalHandler};
use pulse_checks::{AlwaysHealthy, HttpCheck, NeverReady, TcpCheck};
use pulse_config::{AggregatorSettings, CheckConfig};
use pulse_core::{HealthCheck, Priority};
use pulse_server::probe_router;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse health aggregation service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the probe endpoints
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "pulse.yaml")]
        config: PathBuf,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "pulse.yaml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_level } => {
            init_tracing(&log_level)?;

            tracing::info!("Starting Pulse");
            tracing::info!("Config file: {}", config.display());

            let config = pulse_config::load_from_file(&config)?;

            tracing::info!(
                listen = %config.server.listen,
                checks = config.checks.len(),
                auto_check = config.aggregator.auto_check,
                "Configuration loaded"
            );

            let aggregator = HealthAggregator::new(
                aggregator_config(&config.aggregator).with_status_change(|name, record| {
                    tracing::info!(
                        name,
                        liveness = record.liveness,
                        readiness = record.readiness,
                        "Health status changed"
                    );
                }),
            );

            for check in &config.checks {
                let (checker, priority) = build_check(check)?;
                aggregator.register(checker, priority);
            }

            aggregator.start();

            // Tie SIGINT/SIGTERM to the aggregator's own lifecycle so the
            // probe server and the background tasks stop together.
            let shutdown = aggregator.shutdown_signal();
            tokio::spawn(SignalHandler::new(shutdown.clone()).run());

            let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
            pulse_server::serve(listener, probe_router(aggregator.clone()), shutdown).await?;

            aggregator.stop();
            tracing::info!("Pulse stopped");
            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match pulse_config::load_from_file(&config) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Listen: {}", cfg.server.listen);
                    tracing::info!("  Checks: {}", cfg.checks.len());
                    tracing::info!("  Auto-check: {}", cfg.aggregator.auto_check);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Pulse health aggregation service");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

/// Translate the file settings into the aggregator's option set
fn aggregator_config(settings: &AggregatorSettings) -> AggregatorConfig {
    let mut config = AggregatorConfig::new()
        .with_expiry_time(settings.expiry_time)
        .with_update_buffer(settings.update_buffer)
        .with_initial_delay(settings.initial_delay)
        .with_backoff(settings.max_backoff, settings.backoff_factor);
    if settings.auto_check {
        config = config.with_auto_check(settings.check_interval);
    }
    config
}

/// Build a checker instance from a config entry
fn build_check(check: &CheckConfig) -> Result<(Arc<dyn HealthCheck>, Priority)> {
    match check {
        CheckConfig::Tcp {
            name,
            address,
            timeout,
            priority,
        } => Ok((
            Arc::new(TcpCheck::new(name.clone(), address.clone()).with_timeout(*timeout)),
            *priority,
        )),

        CheckConfig::Http {
            name,
            liveness_url,
            readiness_url,
            timeout,
            priority,
        } => {
            let liveness: http::Uri = liveness_url.parse()?;
            let readiness: http::Uri = match readiness_url {
                Some(url) => url.parse()?,
                None => liveness.clone(),
            };
            Ok((
                Arc::new(
                    HttpCheck::new(name.clone(), liveness, readiness).with_timeout(*timeout),
                ),
                *priority,
            ))
        }

        CheckConfig::Static {
            name,
            ready,
            priority,
        } => {
            let checker: Arc<dyn HealthCheck> = if *ready {
                Arc::new(AlwaysHealthy::new(name.clone()))
            } else {
                Arc::new(NeverReady::new(name.clone()))
            };
            Ok((checker, *priority))
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into()),
        )
        .init();

    Ok(())
}
