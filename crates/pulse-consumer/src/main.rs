use anyhow::{anyhow, Result};
use pulse_alert::engine::AlertEngine;
use pulse_alert::rules::attendance::AttendanceRules;
use pulse_alert::rules::nutrition::NutritionRules;
use pulse_alert::Pipeline;
use pulse_common::RecordValidator;
use pulse_consumer::config::ConsumerConfig;
use pulse_consumer::runner;
use pulse_consumer::source::{LineSource, MessageSource};
use pulse_notify::manager::SinkManager;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/pulse.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pulse-consumer attendance [config.toml] [input]   Consume attendance events");
    eprintln!("  pulse-consumer nutrition [config.toml] [input]    Consume meal events");
    eprintln!();
    eprintln!("Input is newline-delimited JSON; stdin when omitted or \"-\".");
    eprintln!("Config defaults to {DEFAULT_CONFIG_PATH} and may be absent.");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let stream = match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(stream @ ("attendance" | "nutrition")) => stream,
        Some(other) => {
            print_usage();
            return Err(anyhow!("unknown stream '{other}'"));
        }
        None => {
            print_usage();
            return Err(anyhow!("missing stream argument"));
        }
    };

    let config_path = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = ConsumerConfig::load_or_default(config_path)?;
    config.apply_env_overrides()?;
    if let Some(input) = args.get(3) {
        config.source.path = Some(input.clone());
    }
    config.validate()?;

    tracing::info!(
        stream,
        config = config_path,
        timezone = %config.timezone,
        "Configuration loaded"
    );

    let validator = RecordValidator::new(config.normalizer()?);
    let sinks = SinkManager::from_configs(&config.sinks).await?;

    match stream {
        "attendance" => {
            let rules = AttendanceRules::new(config.attendance.clone(), validator);
            consume(rules, &config, &sinks).await
        }
        _ => {
            let rules = NutritionRules::new(config.nutrition.clone(), validator);
            consume(rules, &config, &sinks).await
        }
    }
}

async fn consume<P: Pipeline>(pipeline: P, config: &ConsumerConfig, sinks: &SinkManager) -> Result<()> {
    let mut source: Box<dyn MessageSource> = match config.source.file_path() {
        Some(path) => Box::new(LineSource::open(path).await?),
        None => Box::new(LineSource::stdin()),
    };

    let mut engine = AlertEngine::new(pipeline);
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let summary = runner::run(&mut engine, source.as_mut(), sinks, shutdown).await?;
    if summary.sink_flush_failures > 0 {
        tracing::warn!(failures = summary.sink_flush_failures, "Some sinks failed to flush");
    }
    Ok(())
}
