//! omni-send - Background daemon for scheduled publishing
//!
//! Monitors the scheduled post queue and automatically publishes content at
//! the scheduled time, with retry backoff and per-platform fault isolation.

use clap::Parser;
use libomnicast::autopublish::AutoPublishLoop;
use libomnicast::executor::PublishExecutor;
use libomnicast::platforms::exec::ExecPublisher;
use libomnicast::platforms::PublisherRegistry;
use libomnicast::{Config, Database, PostStore, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "omni-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled publishing")]
#[command(long_about = "\
omni-send - Background daemon for scheduled publishing

DESCRIPTION:
    omni-send is a long-running daemon that monitors the Omnicast queue and
    automatically publishes scheduled posts at the right time.

    It scans the queue at a configurable interval, publishes due posts
    oldest-first, applies exponential backoff to transient failures, and
    records terminal failures on the post for later inspection with
    omni-queue.

    Platform clients are external commands configured per platform:

    [publishers.twitter]
    command = \"post-to-twitter\"

    Each command receives the adapted content as JSON on stdin and prints
    the platform post id on stdout. Exit codes: 2 auth failure, 3 content
    rejected, 4 rate limited, anything else is treated as a network error.

USAGE:
    # Run in foreground (logs to stderr)
    omni-send

    # Process due posts once and exit
    omni-send --once

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current scan)

CONFIGURATION:
    Configuration file: ~/.config/omnicast/config.toml

    [auto_publish]
    enabled = true
    check_interval = 5      # minutes between scans

    [auto_publish.retry]
    max_retries = 3
    retry_delay = 5         # minutes before the first retry
    backoff_multiplier = 2.0

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
")]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Process due posts once and exit (for testing)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::new(&config.database.path).await?;
    let store = PostStore::new(Arc::new(db));

    info!("omni-send daemon starting");

    let mut registry = PublisherRegistry::new();
    for (platform, publisher) in &config.publishers {
        registry.register(Arc::new(ExecPublisher::new(
            *platform,
            publisher.command.clone(),
        )));
    }
    if registry.is_empty() {
        warn!("No publishers configured; due posts will fail until one is added");
    } else {
        info!("Configured {} publisher(s)", registry.platforms().len());
    }

    let executor = PublishExecutor::new(store.clone(), registry, config.auto_publish.clone());
    let publish_loop = AutoPublishLoop::new(store, executor, config.auto_publish.clone());

    if cli.once {
        publish_loop.tick().await;
        info!("omni-send: processed posts once, exiting");
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    publish_loop.start().await;

    while !shutdown.load(Ordering::Relaxed) {
        sleep(Duration::from_secs(1)).await;
    }

    publish_loop.stop();
    info!("omni-send daemon stopped");
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| {
        libomnicast::OmnicastError::State(format!("Signal setup failed: {}", e))
    })?;

    let shutdown_clone = shutdown.clone();
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown_clone.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}
