// Internet Watcher - Main Entry Point
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # Internet Watcher
//!
//! Watches NetworkManager for Wi-Fi and mobile broadband transitions and
//! shows exactly one desktop notification per connect or disconnect,
//! staying quiet while the battery is low.
//!
//! This is the entry point for both the daemon (`run`) and the small CLI
//! that talks to it over the session bus.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod control;
mod dbus_client;
mod engine;
mod models;
mod network_utils;
mod providers;
mod services;
mod sinks;

use dbus_client::WatcherClient;
use engine::{NotificationSink, SuppressionPolicy, TransitionEngine};
use models::{AppConfig, FactsSource, MonitorMode, Result};
use providers::{fetch_observation, DbusFacts, FactsProvider, FetchOptions, NmcliFacts};
use services::monitor::{spawn_signal_watcher, spawn_ticker};
use services::systemd::{control_service, ServiceAction};
use services::{Monitor, ReconnectExecutor};
use sinks::{DesktopNotifier, LogNotifier, StatusBoard, StatusSnapshot};

/// Human-readable application name.
pub const APP_NAME: &str = models::APP_NAME;

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "internet-watcher", version, about = "One notification per connectivity change")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/internet-watcher/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the watcher daemon (default)
    Run {
        /// Override the configured monitor mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Override the poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show the current connectivity status
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the running daemon to re-check connectivity now
    Refresh,
    /// Ask the running daemon to reconnect dropped connections
    Reconnect,
    /// Ask the running daemon to exit
    Quit,
    /// Start or stop the systemd user service
    Service {
        #[arg(value_enum)]
        action: ServiceArg,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Push,
    Poll,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ServiceArg {
    Start,
    Stop,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Write a default configuration file if none exists
    Init,
    /// Print the configuration file path
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);

    let config = match AppConfig::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(cli.debug, &config.log_level);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or(Command::Run {
        mode: None,
        interval: None,
    });

    match runtime.block_on(dispatch(command, config, config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_daemon_not_running() {
                eprintln!("Internet Watcher daemon is not running.");
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging: `--debug` wins, then `RUST_LOG`, then the config.
fn init_logging(debug: bool, configured: &str) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug, env.as_deref(), configured))
        .init();
}

fn log_filter(debug: bool, env: Option<&str>, configured: &str) -> EnvFilter {
    if debug {
        return EnvFilter::default().add_directive(tracing::Level::DEBUG.into());
    }
    if let Some(filter) = env.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return filter;
    }
    let level = configured.parse().unwrap_or(tracing::Level::INFO);
    EnvFilter::default().add_directive(level.into())
}

async fn dispatch(command: Command, mut config: AppConfig, config_path: PathBuf) -> Result<()> {
    match command {
        Command::Run { mode, interval } => {
            if let Some(mode) = mode {
                config.monitor.mode = match mode {
                    ModeArg::Push => MonitorMode::Push,
                    ModeArg::Poll => MonitorMode::Poll,
                };
            }
            if let Some(interval) = interval {
                config.monitor.poll_interval_secs = interval;
            }
            config.validate()?;
            run_daemon(config).await
        }
        Command::Status { json } => show_status(&config, json).await,
        Command::Refresh => {
            connected_client().await?.refresh().await?;
            println!("Refresh requested");
            Ok(())
        }
        Command::Reconnect => {
            let (count, failed) = connected_client().await?.reconnect().await?;
            println!("Reconnected {} connection(s)", count);
            for name in failed {
                println!("Failed to reconnect '{}'", name);
            }
            Ok(())
        }
        Command::Quit => {
            connected_client().await?.quit().await?;
            println!("Daemon stopped");
            Ok(())
        }
        Command::Service { action } => {
            let action = match action {
                ServiceArg::Start => ServiceAction::Start,
                ServiceArg::Stop => ServiceAction::Stop,
            };
            control_service(action).await?;
            match action {
                ServiceAction::Start => println!("Service started"),
                ServiceAction::Stop => println!("Service stopped"),
            }
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigAction::Init => {
                if config_path.exists() {
                    println!("Configuration already exists at {}", config_path.display());
                } else {
                    AppConfig::default().save_to_file(&config_path)?;
                    println!("Wrote default configuration to {}", config_path.display());
                }
                Ok(())
            }
        },
    }
}

async fn connected_client() -> Result<WatcherClient> {
    let mut client = WatcherClient::new();
    client.connect().await?;
    Ok(client)
}

/// Ask the daemon; without one, take a single observation directly.
async fn show_status(config: &AppConfig, json: bool) -> Result<()> {
    let mut from_daemon = None;
    if let Ok(client) = connected_client().await {
        if client.ping().await.unwrap_or(false) {
            from_daemon = Some(client.status().await?);
        }
    }

    let snapshot = match from_daemon {
        Some(snapshot) => snapshot,
        None => {
            info!("Daemon not reachable, reading connectivity directly");
            let provider = build_provider(config).await;
            let observation =
                fetch_observation(provider.as_ref(), &fetch_options(config)).await;
            StatusSnapshot::new(observation.state, observation.metrics)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        for line in snapshot.lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

fn fetch_options(config: &AppConfig) -> FetchOptions {
    FetchOptions::new(
        config.monitor.fetch_timeout(),
        config.monitor.ping_target().map(str::to_string),
    )
}

/// Build the configured provider, falling back to `nmcli` without a system bus.
async fn build_provider(config: &AppConfig) -> Arc<dyn FactsProvider> {
    match config.monitor.source {
        FactsSource::Dbus => match DbusFacts::connect().await {
            Ok(facts) => Arc::new(facts),
            Err(e) => {
                warn!("{}, falling back to nmcli", e);
                Arc::new(NmcliFacts::new())
            }
        },
        FactsSource::Nmcli => Arc::new(NmcliFacts::new()),
    }
}

async fn build_notifier() -> Box<dyn NotificationSink> {
    match DesktopNotifier::spawn().await {
        Ok(notifier) => Box::new(notifier),
        Err(e) => {
            warn!("Desktop notifications unavailable ({}), logging transitions instead", e);
            Box::new(LogNotifier)
        }
    }
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    info!("Starting {} v{}", APP_NAME, VERSION);

    let monitor_config = config.monitor.clone();

    let mut mode = monitor_config.effective_mode();
    if mode != monitor_config.mode {
        warn!(
            "{} source cannot push changes, polling instead",
            monitor_config.source.as_str()
        );
    }

    // Push mode needs the concrete D-Bus source for its change signals.
    let mut push_source = None;
    let provider: Arc<dyn FactsProvider> = if mode == MonitorMode::Push {
        match DbusFacts::connect().await {
            Ok(facts) => {
                let facts = Arc::new(facts);
                push_source = Some(Arc::clone(&facts));
                facts
            }
            Err(e) => {
                warn!("{}, falling back to nmcli polling", e);
                mode = MonitorMode::Poll;
                Arc::new(NmcliFacts::new())
            }
        }
    } else {
        build_provider(&config).await
    };

    let status = StatusBoard::new();
    let engine = TransitionEngine::new(
        SuppressionPolicy::from_config(&config),
        build_notifier().await,
        Box::new(status.clone()),
    );

    info!(
        "Monitoring via {} in {} mode",
        provider.name(),
        mode.as_str()
    );
    let monitor = Monitor::start(engine, provider, fetch_options(&config));
    let handle = monitor.handle();

    let trigger_task = match push_source {
        Some(facts) => spawn_signal_watcher(facts, handle.clone(), monitor_config.poll_interval()),
        None => spawn_ticker(handle.clone(), monitor_config.poll_interval()),
    };

    let control = control::ControlInterface::new(handle.clone(), status, ReconnectExecutor::new());
    let _control_conn = match control::serve(control).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!("Control interface unavailable: {}", e);
            None
        }
    };

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Interrupted, shutting down");
        shutdown_handle.shutdown().await;
    });

    monitor.wait().await;
    trigger_task.abort();
    Ok(())
}
