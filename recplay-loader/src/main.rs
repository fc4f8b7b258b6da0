//! recplay-loader - command-line resource loader
//!
//! Loads one record's resources and prints the playback handoff as JSON
//! once the load is ready.
//!
//! Exit codes:
//! - 0: ready, handoff printed to stdout
//! - 1: load failed (error code on stderr) or invalid invocation
//! - 2: every request settled but the load never completed

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use recplay_common::config::ConfigResolver;
use recplay_common::human_time::{format_start_time, parse_start_time};
use recplay_common::EventBus;
use recplay_loader::{HttpFetcher, Layout, LoadAttempt, LoadRequest, LoadState, RouteContext};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for recplay-loader
#[derive(Parser, Debug)]
#[command(name = "recplay-loader")]
#[command(about = "Load a recorded session's resources for playback")]
#[command(version)]
struct Args {
    /// Config file (overrides RECPLAY_CONFIG and the user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL resources are fetched from
    #[arg(short, long)]
    base_url: Option<String>,

    /// Playback URL carrying the record id, layout and start time
    #[arg(short, long, conflicts_with = "record_id")]
    url: Option<String>,

    /// Record id to load
    record_id: Option<String>,

    /// Layout (standard, content, media, disabled), ignored with --url
    #[arg(short, long)]
    layout: Option<String>,

    /// Start time (e.g. 90, 1h2m3s), ignored with --url
    #[arg(short = 't', long)]
    time: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = ConfigResolver::new()
        .with_config_file(args.config.clone())
        .with_base_url(args.base_url.clone())
        .resolve()
        .context("Failed to resolve configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "recplay_loader={level},recplay_common={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting recplay-loader {}", env!("CARGO_PKG_VERSION"));
    info!("Base URL: {}", config.base_url);

    let request = build_request(&args)?;
    if let Some(start_time) = request.start_time {
        info!("Start time: {}", format_start_time(start_time));
    }

    let fetcher = HttpFetcher::new(config.request_timeout())
        .context("Failed to create HTTP client")?;

    let event_bus = EventBus::new(100);
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(event = event.name(), "{:?}", event);
        }
    });

    let attempt = LoadAttempt::new(request, &config, Arc::new(fetcher)).with_event_bus(event_bus);
    let mut state_rx = attempt.subscribe();

    let state = match attempt.start() {
        None => attempt.state(),
        Some(mut driver) => {
            tokio::select! {
                result = state_rx.wait_for(LoadState::is_terminal) => match result {
                    Ok(state) => (*state).clone(),
                    Err(_) => attempt.state(),
                },
                _ = &mut driver => attempt.state(),
            }
        }
    };

    match state {
        LoadState::Ready(handoff) => {
            let json = serde_json::to_string_pretty(handoff.as_ref())
                .context("Failed to serialize handoff")?;
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        LoadState::Error(kind) => {
            eprintln!("{}", kind.code());
            Ok(ExitCode::from(1))
        }
        LoadState::Init | LoadState::Loading { .. } => {
            eprintln!("Load stalled: {}", state.name());
            Ok(ExitCode::from(2))
        }
    }
}

fn build_request(args: &Args) -> Result<LoadRequest> {
    if let Some(url) = &args.url {
        return RouteContext::parse(url).context("Failed to parse playback URL");
    }

    let layout = match &args.layout {
        Some(raw) => Layout::parse(raw).with_context(|| format!("Unknown layout: {}", raw))?,
        None => Layout::default(),
    };
    let start_time = args
        .time
        .as_deref()
        .map(parse_start_time)
        .transpose()
        .context("Invalid start time")?;

    Ok(LoadRequest::new(args.record_id.as_deref())
        .with_layout(layout)
        .with_start_time(start_time))
}
