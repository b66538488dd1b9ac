// src/bin/multi_translator_cli.rs

use dotenv::dotenv;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use multi_translator::logging;
use multi_translator::{Aggregator, Engine, EngineConfig, EventReceiver, HttpProvider, TranslatorError};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "multi_translator_cli",
    about = "Translate text through several providers at once"
)]
struct Opt {
    /// Text to translate
    text: String,

    /// Target language, defaults to the configured one
    #[structopt(short, long)]
    target: Option<String>,

    /// JSON configuration file
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Emit logs as JSON
    #[structopt(long)]
    json_logs: bool,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

fn init_tracing(opt: &Opt) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if opt.disable_logs {
        "error"
    } else {
        match opt.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = format!(
        "multi_translator_cli={},multi_translator={}",
        log_level, log_level
    );

    // Progress bars own stdout
    if opt.json_logs {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_env_filter(EnvFilter::new(&filter))
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        logging::init_with_default(&filter);
    }
    Ok(())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:>12} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Feed the progress bars from the event stream until every producer is gone
async fn render(mut rx: EventReceiver) -> Aggregator {
    let bars = MultiProgress::new();
    let probes = bars.add(ProgressBar::new(0));
    probes.set_style(bar_style());
    probes.set_prefix("probing");
    let translations = bars.add(ProgressBar::new(0));
    translations.set_style(bar_style());
    translations.set_prefix("translating");

    let mut aggregator = Aggregator::new();
    while let Some(event) = rx.recv().await {
        aggregator.apply(&event);

        let progress = aggregator.progress();
        probes.set_length(progress.probes_total as u64);
        probes.set_position(progress.probes_resolved as u64);
        translations.set_length(progress.translations_dispatched as u64);
        translations.set_position(progress.translations_completed as u64);

        if let Some(provider) = event.provider() {
            let display = aggregator.display(provider).unwrap_or_default();
            let line = display.lines().next().unwrap_or_default();
            let message = format!("{}: {}", provider, line);
            if aggregator.is_probing_complete() {
                translations.set_message(message);
            } else {
                probes.set_message(message);
            }
        }
    }

    probes.finish_with_message("done");
    translations.finish_with_message("done");
    aggregator
}

fn print_results(aggregator: &Aggregator) {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Provider"),
        Cell::new("Status"),
        Cell::new("Attempts"),
        Cell::new("Result"),
    ]));

    for provider in aggregator.providers() {
        let Some(view) = aggregator.view(provider) else {
            continue;
        };
        table.add_row(Row::new(vec![
            Cell::new(provider),
            Cell::new(&view.status.to_string()),
            Cell::new(&view.attempts.to_string()),
            Cell::new(&view.display),
        ]));
    }

    table.printstd();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let opt = Opt::from_args();
    init_tracing(&opt)?;

    let mut config = match &opt.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env();

    let adapter = Arc::new(HttpProvider::new()?);
    let (engine, rx) = Engine::new(config, adapter)?;
    let renderer = tokio::spawn(render(rx));

    engine.probe().await;
    match engine.translate(&opt.text, opt.target.as_deref()).await {
        Ok(outcomes) => {
            let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
            info!(succeeded, total = outcomes.len(), "Translation finished");
        }
        Err(TranslatorError::NoProviders) => {
            error!("No translation provider is reachable");
        }
        Err(err) => return Err(err.into()),
    }

    // Dropping the engine closes the event stream
    drop(engine);
    let aggregator = renderer.await?;
    print_results(&aggregator);

    Ok(())
}
