use anyhow::{anyhow, bail, Context, Result};
use pulse_consumer::replay::{self, ReplayOptions};
use std::env;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

struct Config {
    input: String,
    options: ReplayOptions,
}

enum CliAction {
    Run(Config),
    Help,
}

fn usage() {
    eprintln!(
        "Usage:\n  pulse-replay <records.json|records.jsonl> [options]\n\nOptions:\n  --interval-ms <n>  pause between records (default: 1000)\n  --loop             start over after the last record\n  -h, --help         show this help"
    );
}

fn parse_cli() -> Result<CliAction> {
    let mut input = None;
    let mut options = ReplayOptions::default();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "--interval-ms" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --interval-ms"))?;
                let ms = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid number for --interval-ms: {value}"))?;
                options.interval = Duration::from_millis(ms);
            }
            "--loop" => options.repeat = true,
            flag if flag.starts_with("--") => bail!("unknown argument: {flag}"),
            _ if input.is_none() => input = Some(arg.clone()),
            _ => bail!("unexpected argument: {arg}"),
        }
    }

    let input = input.ok_or_else(|| anyhow!("missing input file"))?;
    Ok(CliAction::Run(Config { input, options }))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = match parse_cli() {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            usage();
            return Ok(());
        }
        Err(e) => {
            usage();
            return Err(e);
        }
    };

    let text = tokio::fs::read_to_string(&config.input)
        .await
        .with_context(|| format!("Failed to read '{}'", config.input))?;
    let records = replay::parse_records(&text)?;
    tracing::info!(
        input = %config.input,
        records = records.len(),
        interval_ms = config.options.interval.as_millis() as u64,
        repeat = config.options.repeat,
        "Replaying records"
    );

    let mut stdout = tokio::io::stdout();
    tokio::select! {
        result = replay::replay(&records, &mut stdout, config.options) => {
            match result {
                Ok(written) => tracing::info!(written, "Replay finished"),
                Err(e) if is_broken_pipe(&e) => tracing::info!("Reader closed the pipe"),
                Err(e) => return Err(e),
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}

fn is_broken_pipe(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::BrokenPipe)
}
