pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod services;

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use commands::AppState;
use config::EngineConfig;
use crate::core::ConnectionTracker;
use services::BackgroundServices;

/// Read newline-delimited snapshots and control words from stdin, reconcile
/// them, and print the final published views as JSON on EOF.
pub async fn run() -> anyhow::Result<()> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in connwatch: {info}");
        default_hook(info);
    }));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connwatch_lib=info".into()),
        )
        .init();

    let engine_config = EngineConfig::from_env()?;
    tracing::info!("Keeping up to {} closed connections", engine_config.max_closed_rows);

    let tracker = ConnectionTracker::new(engine_config);
    let pause = tracker.pause_gate();
    let (event_tx, event_rx) = mpsc::channel(config::SNAPSHOT_CHANNEL_CAPACITY);
    let (publisher, views) = watch::channel(tracker.views());

    let services = BackgroundServices::start(tracker, event_rx, publisher);
    let state = AppState {
        views,
        pause,
        events: event_tx,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0u64;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        line_no += 1;
        match commands::logic::parse_input_line(&line) {
            Ok(parsed) => commands::system::apply_input_line(&state, parsed).await?,
            Err(e) => tracing::warn!("Skipping line {line_no}: {e}"),
        }
    }

    drop(state);
    let tracker = services.shutdown().await?;
    let final_views = tracker.views();
    services::log_summary(&final_views);

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &*final_views).context("failed to write views")?;
    writeln!(stdout)?;
    Ok(())
}
