//! Nova agent CLI

mod plugins;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nova_agent_config::{load_config, validate_log_level, LogFormat};
use nova_agent_runtime::Agent;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

#[derive(Parser)]
#[command(name = "nova-agent")]
#[command(about = "Nova plugin agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent until SIGINT or SIGTERM
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "agent.yaml", env = "NOVA_AGENT_CONFIG")]
        config: PathBuf,

        /// Log level (trace, debug, info, warn, error), overrides the config file
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "agent.yaml", env = "NOVA_AGENT_CONFIG")]
        config: PathBuf,
    },

    /// List plugins compiled into this binary
    Plugins,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, log_level } => {
            let path = config;
            let config = load_config(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;

            let level = log_level.as_deref().unwrap_or(config.logging.level.as_str());
            init_tracing(level, config.logging.format)?;

            tracing::info!(
                agent = %config.agent.name,
                config = %path.display(),
                "Starting Nova agent"
            );

            let mut agent = Agent::with_config(config.workers.clone());
            for plugin in config.enabled_plugins() {
                agent.register_shared(plugins::build(plugin)?)?;
            }

            agent.init()?;
            agent.run_threads()?;

            wait_for_shutdown().await?;

            let (mut agent, outcome) = tokio::task::spawn_blocking(move || {
                let outcome = agent.stop_threads();
                (agent, outcome)
            })
            .await?;

            let deinit = agent.deinit();
            outcome.context("agent stopped with plugin failures")?;
            deinit?;

            tracing::info!("Agent stopped");
            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config) {
                Ok(cfg) => {
                    for plugin in cfg.enabled_plugins() {
                        if let Err(e) = plugins::build(plugin) {
                            tracing::error!("✗ {e:#}");
                            std::process::exit(1);
                        }
                    }
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Agent: {}", cfg.agent.name);
                    tracing::info!("  Plugins: {}", cfg.enabled_plugins().count());
                    tracing::info!(
                        "  Join timeout: {}",
                        cfg.workers
                            .join_timeout
                            .map(|t| format!("{t:?}"))
                            .unwrap_or_else(|| "none".to_string())
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Plugins => {
            for name in plugins::BUILTIN_PLUGINS {
                println!("{name}");
            }
            Ok(())
        }

        Commands::Version => {
            println!("Nova agent");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Plugin API: {}", nova_agent_plugin_api::API_VERSION);
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn parse_level(level: &str) -> Result<tracing::Level> {
    validate_log_level(level)?;
    Ok(level.parse()?)
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = parse_level(level)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_thread_names(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into()))
        .try_init()?;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}
