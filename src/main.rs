//! TestForge connectivity CLI
//!
//! Drives the resilient API client from the command line.
//!
//! # Architecture Overview
//!
//! ```text
//!   testforge <command>
//!        │
//!        ▼
//!   ┌──────────┐    ┌───────────┐    ┌──────────────┐
//!   │  config  │───▶│ ApiClient │───▶│  connection  │
//!   │  (TOML)  │    │           │    │ state + timer│
//!   └──────────┘    └─────┬─────┘    └──────────────┘
//!                         │
//!              ┌──────────┴──────────┐
//!              ▼                     ▼
//!        ┌───────────┐        ┌────────────┐
//!        │  health   │        │  executor  │──▶ backend /api/*
//!        │  prober   │        │ (deadline) │
//!        └───────────┘        └────────────┘
//! ```
//!
//! `watch` keeps the client alive with the background health monitor,
//! config hot reload and an optional Prometheus endpoint until Ctrl-C.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use testforge_connect::client::{TestCustomRequest, TestGithubRequest};
use testforge_connect::config::{load_config, watcher::ConfigWatcher, ClientConfig};
use testforge_connect::health::HealthMonitor;
use testforge_connect::lifecycle::signals::shutdown_on_signal;
use testforge_connect::observability::{logging, metrics};
use testforge_connect::{ApiClient, RequestOutcome, Shutdown};

#[derive(Parser)]
#[command(name = "testforge")]
#[command(about = "Resilient client for the TestForge mutation-testing API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the hostname used to pick local or production candidates
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override the same-origin base URL
    #[arg(long, global = true)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover a backend and print its health
    Health,
    /// Run the bundled demo mutation test
    Demo,
    /// Mutation-test code from a local file
    Custom {
        #[arg(short, long)]
        file: PathBuf,
        /// File with custom tests to run against the code
        #[arg(short, long)]
        tests: Option<PathBuf>,
        /// Ask the backend to generate tests
        #[arg(long)]
        ai: bool,
    },
    /// Mutation-test a GitHub repository
    Github {
        #[arg(short, long)]
        repo: String,
        /// File in the repository to mutate
        #[arg(long)]
        target: Option<String>,
        #[arg(short, long)]
        tests: Option<PathBuf>,
        #[arg(long)]
        ai: bool,
    },
    /// Fetch results of an earlier session
    Results { session: String },
    /// Probe once and print connection state and telemetry
    Status,
    /// Keep monitoring the backend until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = cli.host {
        config.endpoints.hostname = host;
    }
    if let Some(origin) = cli.origin {
        config.endpoints.origin = Some(origin);
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "testforge starting");

    let client = ApiClient::from_config(&config)?;

    match cli.command {
        Commands::Health => print_outcome(client.check_health().await)?,
        Commands::Demo => print_outcome(client.run_demo_test().await)?,
        Commands::Custom { file, tests, ai } => {
            let request = TestCustomRequest {
                code: std::fs::read_to_string(&file)?,
                custom_tests: tests.map(std::fs::read_to_string).transpose()?,
                generate_ai_tests: ai.then_some(true),
            };
            print_outcome(client.test_custom_code(request).await)?;
        }
        Commands::Github {
            repo,
            target,
            tests,
            ai,
        } => {
            let request = TestGithubRequest {
                repo_url: repo,
                target_file: target,
                custom_tests: tests.map(std::fs::read_to_string).transpose()?,
                generate_ai_tests: ai.then_some(true),
            };
            print_outcome(client.test_github_repo(request).await)?;
        }
        Commands::Results { session } => print_outcome(client.get_results(&session).await)?,
        Commands::Status => {
            let health = client.check_health().await;
            if let Some(message) = health.user_message() {
                eprintln!("{message}");
            }
            print_json(&client.status())?;
        }
        Commands::Watch => watch(client, cli.config, &config).await?,
    }

    Ok(())
}

async fn watch(
    client: ApiClient,
    config_path: Option<PathBuf>,
    config: &ClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let monitor = tokio::spawn(HealthMonitor::new(client.clone()).run(shutdown.subscribe()));

    // The notify watcher stops when dropped; keep it for the whole loop.
    let mut _watcher = None;
    let mut updates = None;
    if let Some(path) = config_path {
        let (watcher, rx) = ConfigWatcher::new(&path);
        match watcher.run() {
            Ok(handle) => {
                _watcher = Some(handle);
                updates = Some(rx);
            }
            Err(e) => tracing::warn!(error = %e, "Config hot reload unavailable"),
        }
    }

    let mut stop = shutdown.subscribe();
    loop {
        tokio::select! {
            Some(new_config) = async {
                match updates.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                client.apply_config(&new_config);
            }
            _ = stop.recv() => break,
        }
    }

    monitor.await?;
    print_json(&client.status())?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_outcome<T: Serialize>(outcome: RequestOutcome<T>) -> Result<(), Box<dyn std::error::Error>> {
    let value = outcome.into_result()?;
    print_json(&value)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
