//! spent - records how time is spent across foreground windows.
//!
//! `spent record` writes one CSV row (or JSONL line) per activity segment;
//! `spent serve` accumulates segments into counters served on `/metrics`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

use spent::config::{Config, LogFormat};
use spent::monitor::Monitor;
use spent::reporter::Reporter;
use spent::sample::{IdlePolicy, NativeSampler};
use spent::server;
use spent::sink::{ActivityMetrics, CsvSink, JsonlSink, MetricsSink};

/// Application version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default flush interval when recording segments.
const RECORD_FLUSH_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Default flush interval when exporting counters.
const SERVE_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "spent", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write each activity segment as it completes.
    Record {
        /// Output format: CSV on stdout, or JSONL files under the data directory.
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Longest segment in seconds written without a title change.
        #[arg(long)]
        flush_interval: Option<u64>,
    },
    /// Serve accumulated idle and active time on /metrics.
    Serve {
        /// Address to listen on for HTTP requests.
        #[arg(long)]
        listen_address: Option<String>,

        /// Longest segment in seconds accounted without a title change.
        #[arg(long)]
        flush_interval: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Jsonl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Record { flush_interval, .. } => {
            if flush_interval.is_some() {
                config.report.flush_interval_seconds = *flush_interval;
            }
        }
        Command::Serve {
            listen_address,
            flush_interval,
        } => {
            if flush_interval.is_some() {
                config.report.flush_interval_seconds = *flush_interval;
            }
            if let Some(addr) = listen_address {
                config.exporter.listen_address = addr.clone();
            }
        }
    }
    config.validate()?;

    init_tracing(&config.logging.level, config.logging.format)?;

    info!("Starting spent v{}", VERSION);
    info!(
        "Configuration loaded: poll interval={}s, idle cutoff={}s",
        config.poll.interval_seconds, config.idle.cutoff_seconds
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let result = match cli.command {
        Command::Record { format, .. } => run_record(&config, format, shutdown_rx).await,
        Command::Serve { .. } => run_serve(&config, shutdown_rx).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

/// Resolve once shutdown has been requested.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

fn idle_policy(config: &Config) -> IdlePolicy {
    IdlePolicy::new(config.idle.cutoff(), config.idle.sentinel.clone())
}

fn new_monitor(config: &Config, flush_default: Duration) -> Result<Monitor<NativeSampler>> {
    let sampler = NativeSampler::new().context("Unable to sample the desktop")?;
    let policy = idle_policy(config);
    let reporter = Reporter::new(config.report.flush_interval_or(flush_default));
    info!("Flush interval: {:?}", reporter.flush_interval());
    Ok(Monitor::new(sampler, policy, reporter))
}

async fn run_record(
    config: &Config,
    format: OutputFormat,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let monitor = new_monitor(config, RECORD_FLUSH_INTERVAL)?;
    let mut monitor = match format {
        OutputFormat::Csv => monitor.with_sink(CsvSink::stdout()),
        OutputFormat::Jsonl => {
            let mut sink = JsonlSink::new(config.logging.logs_dir())?;
            sink.log_session_start(VERSION)?;
            monitor.with_sink(sink)
        }
    };

    monitor
        .run(config.poll.interval(), wait_for_shutdown(shutdown))
        .await?;

    info!("Goodbye!");
    Ok(())
}

async fn run_serve(config: &Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    let addr = config.exporter.socket_addr()?;
    let listener = server::bind(addr).await?;
    let metrics = Arc::new(ActivityMetrics::new()?);

    let mut monitor = new_monitor(config, SERVE_FLUSH_INTERVAL)?
        .with_sink(MetricsSink::new(metrics.clone(), idle_policy(config)));

    // The server stops on Ctrl-C or when the poll loop exits; the poll loop
    // stops on Ctrl-C or when the server exits.
    let (stop_tx, stop_rx) = watch::channel(false);
    let (server_done_tx, server_done_rx) = oneshot::channel::<()>();
    let server_shutdown = {
        let ctrl_c = shutdown.clone();
        async move {
            tokio::select! {
                _ = wait_for_shutdown(ctrl_c) => {}
                _ = wait_for_shutdown(stop_rx) => {}
            }
        }
    };
    let server = tokio::spawn(async move {
        let served = server::serve(listener, metrics, server_shutdown).await;
        let _ = server_done_tx.send(());
        served
    });

    let poll_shutdown = async move {
        tokio::select! {
            _ = wait_for_shutdown(shutdown) => {}
            _ = server_done_rx => {}
        }
    };
    let polled = monitor.run(config.poll.interval(), poll_shutdown).await;
    let _ = stop_tx.send(true);

    let served = server.await.context("Metrics server task panicked")?;
    served?;
    polled?;

    info!("Goodbye!");
    Ok(())
}

/// Initialize tracing subscriber with the given log level, writing to stderr.
fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
