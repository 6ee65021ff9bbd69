//! CLI entry point for the NextBus arrival feed.
//!
//! `fetch` runs a single prediction query. `watch` starts one background
//! poller per configured stop and periodically logs extrapolated arrival
//! times until interrupted.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use nextbus_feed::{
    config::FeedConfig,
    extrapolate::DisplayFilter,
    feed::FeedManager,
    fetch::{BasicClient, DEFAULT_BASE_URL, NextBusClient, PredictionSource},
    output::append_record,
    poller::DEFAULT_REQUEST_TIMEOUT,
    snapshot::Snapshot,
    subject::Subject,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nextbus_feed")]
#[command(about = "Live transit arrival estimates from the NextBus feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query predictions for one stop once and print them
    Fetch {
        /// Agency tag (e.g. "actransit")
        #[arg(short, long)]
        agency: String,

        /// Route tag (e.g. "210")
        #[arg(short, long)]
        route: String,

        /// Stop tag (e.g. "0702640")
        #[arg(short, long)]
        stop: String,

        /// Prediction service endpoint
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Poll every configured stop in the background and log arrival estimates
    Watch(WatchArgs),
}

#[derive(Args)]
struct WatchArgs {
    /// JSON config listing the stops to poll (defaults to the built-in AC Transit stops)
    #[arg(short, long, env = "NEXTBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Override: seconds between queries for each stop
    #[arg(short, long)]
    interval: Option<u64>,

    /// Override: startup delay increment between consecutive stops, in seconds
    #[arg(long)]
    stagger: Option<u64>,

    /// Override: per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Override: prediction service endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// How often to log extrapolated arrivals, in seconds
    #[arg(long, default_value_t = 5)]
    refresh: u64,

    /// Drop arrivals at or below this many minutes
    #[arg(long, default_value_t = 0)]
    min_minutes: i64,

    /// Show at most this many arrivals per stop
    #[arg(long)]
    max_predictions: Option<usize>,

    /// Optional: append every new snapshot to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nextbus_feed.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nextbus_feed.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            agency,
            route,
            stop,
            base_url,
        } => {
            let subject = Subject::new(agency, route, stop, "");
            let client = NextBusClient::new(BasicClient::new(DEFAULT_REQUEST_TIMEOUT)?, base_url);
            info!(subject = %subject, base_url = client.base_url(), "Querying predictions");
            let arrivals = client
                .fetch(&subject)
                .await
                .with_context(|| format!("prediction query for {subject} failed"))?;

            if arrivals.is_empty() {
                info!("No predictions");
            }
            for seconds in arrivals {
                info!(seconds, minutes = seconds / 60, "Arrival");
            }
        }
        Commands::Watch(args) => watch(args).await?,
    }

    Ok(())
}

/// Builds the feed config from the optional file plus CLI overrides.
fn load_config(args: &WatchArgs) -> Result<FeedConfig> {
    let mut config = match &args.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    };

    if let Some(secs) = args.interval {
        config.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.stagger {
        config.stagger = Duration::from_secs(secs);
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Runs the feed until Ctrl-C, logging extrapolated arrivals every refresh.
#[tracing::instrument(skip_all, fields(refresh = args.refresh))]
async fn watch(args: WatchArgs) -> Result<()> {
    let config = load_config(&args)?;
    let http = BasicClient::new(config.request_timeout)?;
    let source = Arc::new(NextBusClient::new(http, config.base_url.clone()));
    let feed = FeedManager::start(&config, source);

    if let Some(path) = &args.output {
        info!(path = %path.display(), "Recording snapshots");
        spawn_recorder(&feed, path.clone());
    }

    let filter = DisplayFilter {
        min_minutes: args.min_minutes,
        max_predictions: args.max_predictions,
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(args.refresh.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => report(&feed, &filter),
            res = &mut shutdown => {
                if let Err(e) = res {
                    error!(error = %e, "Failed to listen for Ctrl-C");
                }
                break;
            }
        }
    }

    feed.shutdown();
    Ok(())
}

/// Logs every subject's arrivals extrapolated to now.
fn report(feed: &FeedManager, filter: &DisplayFilter) {
    let now = Utc::now();
    for poller in feed.pollers() {
        let subject = poller.subject();
        let snapshot = poller.current_snapshot();
        let minutes = filter.minutes(&snapshot, now);
        let age_secs = snapshot.age(now).map(|age| age.num_seconds());

        if minutes.is_empty() {
            info!(route = subject.route(), label = subject.label(), age_secs, "No predictions");
        } else {
            info!(
                route = subject.route(),
                label = subject.label(),
                minutes = ?minutes,
                age_secs,
                "Arrivals"
            );
        }
    }
}

/// Appends each newly published snapshot to `path` from a single writer task.
fn spawn_recorder(feed: &FeedManager, path: PathBuf) {
    let (tx, mut rx) = mpsc::unbounded_channel::<(Subject, Arc<Snapshot>)>();

    for poller in feed.pollers() {
        let mut reader = poller.subscribe();
        let subject = poller.subject().clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = reader.changed().await {
                if tx.send((subject.clone(), snapshot)).is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    tokio::spawn(async move {
        while let Some((subject, snapshot)) = rx.recv().await {
            match append_record(&path, &subject, &snapshot) {
                Ok(()) => debug!(subject = %subject, "Snapshot recorded"),
                Err(e) => error!(error = %e, subject = %subject, "Failed to record snapshot"),
            }
        }
    });
}
