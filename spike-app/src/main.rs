mod pipeline;

use anyhow::Result;
use clap::Parser;
use futures::future::join_all;
use pipeline::{report_progress, Pipeline};
use spike_anomaly::DetectorManager;
use spike_config::ConfigManager;
use spike_core::{stream::SyntheticStream, MonitorConfig, SinkConfig, SpikeError, VerdictEvent};
use spike_notifier::{ChannelSink, ConsoleSink, JsonLinesSink, SinkManager};
use std::{path::PathBuf, sync::Arc};
use tokio::{
    signal,
    sync::{broadcast, mpsc},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PROGRESS_EVERY: u64 = 100;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "SPIKE_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Number of independent synthetic streams
    #[arg(long)]
    streams: Option<usize>,

    /// Observations per stream
    #[arg(long, conflicts_with = "unbounded")]
    length: Option<u64>,

    /// Keep generating until interrupted
    #[arg(long)]
    unbounded: bool,

    /// Milliseconds between observations, 0 for no pacing
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seed for reproducible streams
    #[arg(long)]
    seed: Option<u64>,

    /// Detector window capacity
    #[arg(long)]
    window: Option<usize>,

    /// Standard deviations above the mean that count as anomalous
    #[arg(long, allow_negative_numbers = true)]
    sensitivity: Option<f64>,

    /// Observations required before detection starts
    #[arg(long)]
    warm_up: Option<usize>,

    /// Print every observation, not only anomalies
    #[arg(short, long)]
    verbose: bool,

    /// Disable console reporting
    #[arg(short, long)]
    quiet: bool,

    /// Also write every verdict to this file as JSON lines
    #[arg(long)]
    json_out: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(window) = self.window {
            config.detector.window_capacity = window;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.detector.sensitivity_factor = sensitivity;
        }
        if let Some(warm_up) = self.warm_up {
            config.detector.min_warm_up = warm_up;
        }

        if let Some(streams) = self.streams {
            config.source.streams = streams;
        }
        if let Some(length) = self.length {
            config.source.length = Some(length);
        }
        if self.unbounded {
            config.source.length = None;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.source.interval_ms = interval_ms;
        }
        if self.seed.is_some() {
            config.source.seed = self.seed;
        }

        if self.verbose {
            config.sink.verbose = true;
        }
        if self.quiet {
            config.sink.console_enabled = false;
        }
        if self.json_out.is_some() {
            config.sink.json_lines_path = self.json_out.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.debug, args.log_json);

    info!("Starting Spike Monitor");

    let config = load_config(&args)?;

    let detectors = Arc::new(DetectorManager::new(config.detector.clone())?);
    let (sinks, verdicts) = init_sinks(&config.sink).await?;
    let reporter = tokio::spawn(report_progress(verdicts, PROGRESS_EVERY));

    let (tx, rx) = mpsc::channel(config.source.streams.max(1) * 64);

    let sources: Vec<_> = (0..config.source.streams)
        .map(|i| {
            let mut source_config = config.source.clone();
            source_config.seed = config
                .source
                .seed
                .map(|seed| seed.wrapping_add(i as u64));
            let stream = SyntheticStream::new(format!("stream-{i}"), source_config);
            tokio::spawn(stream.run(tx.clone()))
        })
        .collect();
    drop(tx);

    info!(
        streams = config.source.streams,
        window_capacity = config.detector.window_capacity,
        sensitivity = config.detector.sensitivity_factor,
        "Detection pipeline running"
    );

    let summary = Pipeline::new(detectors, sinks)
        .run(rx, shutdown_signal())
        .await;

    for source in &sources {
        source.abort();
    }
    for result in join_all(sources).await {
        match result {
            Ok(Ok(sent)) => debug!(sent, "Source completed"),
            Ok(Err(SpikeError::Stream(reason))) => debug!("Source stopped: {}", reason),
            Ok(Err(e)) => error!("Source failed: {}", e),
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!("Source task panicked: {}", e),
        }
    }

    if let Err(e) = reporter.await {
        error!("Progress reporter failed: {}", e);
    }

    summary.log();

    info!("Spike Monitor stopped");

    Ok(())
}

fn init_logging(debug: bool, json: bool) {
    let env_filter = if debug { "debug" } else { "info" };

    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| env_filter.into()),
    );

    // stdout belongs to the console sink
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut manager = match &args.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::from_env()?,
    };

    args.apply(manager.get_config_mut());
    manager.validate()?;

    Ok(manager.into_config())
}

async fn init_sinks(
    config: &SinkConfig,
) -> Result<(SinkManager, broadcast::Receiver<VerdictEvent>)> {
    let mut manager = SinkManager::new();

    manager.add_sink(Box::new(ConsoleSink::from_config(config)));

    if let Some(path) = &config.json_lines_path {
        manager.add_sink(Box::new(JsonLinesSink::create(path).await?));
    }

    let channel = ChannelSink::new(config.broadcast_capacity);
    let verdicts = channel.subscribe();
    manager.add_sink(Box::new(channel));

    if !config.console_enabled && config.json_lines_path.is_none() {
        warn!("Console and file output disabled, only progress will be logged");
    }

    info!(sinks = ?manager.enabled_sinks(), "Verdict sinks initialized");
    Ok((manager, verdicts))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}
