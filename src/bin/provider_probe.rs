// src/bin/provider_probe.rs

use dotenv::dotenv;
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use multi_translator::{Engine, EngineConfig, HttpProvider};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "provider_probe",
    about = "Check which translation providers are reachable"
)]
struct Opt {
    /// JSON configuration file
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Probe timeout in milliseconds
    #[structopt(long)]
    timeout_ms: Option<u64>,

    /// Delay between probe starts in milliseconds
    #[structopt(long)]
    stagger_ms: Option<u64>,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "provider_probe={},multi_translator={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &opt.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env();
    if let Some(timeout_ms) = opt.timeout_ms {
        config.probe.timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(stagger_ms) = opt.stagger_ms {
        config.probe.stagger = Duration::from_millis(stagger_ms);
    }

    let (engine, _events) = Engine::new(config, Arc::new(HttpProvider::new()?))?;
    let report = engine.probe().await;
    info!(
        available = report.available.len(),
        total = report.outcomes.len(),
        "Probe round finished"
    );

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Provider"),
        Cell::new("Available"),
        Cell::new("Status"),
        Cell::new("Elapsed"),
        Cell::new("Checked at"),
        Cell::new("Error"),
    ]));
    for outcome in &report.outcomes {
        let status = outcome
            .status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(Row::new(vec![
            Cell::new(&outcome.provider),
            Cell::new(if outcome.is_available() { "yes" } else { "no" }),
            Cell::new(&status),
            Cell::new(&format!("{} ms", outcome.elapsed.as_millis())),
            Cell::new(&outcome.checked_at.format("%H:%M:%S%.3f").to_string()),
            Cell::new(outcome.error.as_deref().unwrap_or_default()),
        ]));
    }
    table.printstd();

    println!(
        "\n{} of {} providers available",
        report.available.len(),
        report.outcomes.len()
    );
    Ok(())
}
