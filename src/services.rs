//! Background service lifecycle management.
//!
//! `BackgroundServices` owns the tokio tasks spawned at startup:
//! 1. Snapshot ingestor (drains the event channel in order, publishes views)
//! 2. Summary reporter (periodic log of the published views)

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::commands::logic::{summarize, top_connections};
use crate::config;
use crate::core::{ConnectionTracker, ConnectionViews, SnapshotMessage};

/// One entry of the ingestor's queue. Pause changes travel with the snapshots
/// so they take effect exactly between the snapshots they were issued between.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    Snapshot(SnapshotMessage),
    SetPaused(bool),
}

/// Handles to the running background tasks.
pub struct BackgroundServices {
    ingestor: JoinHandle<ConnectionTracker>,
    reporter: JoinHandle<()>,
}

impl BackgroundServices {
    /// Start the ingestor and the reporter. The ingestor stops once every
    /// event sender has been dropped.
    pub fn start(
        tracker: ConnectionTracker,
        events: mpsc::Receiver<IngestEvent>,
        publisher: watch::Sender<Arc<ConnectionViews>>,
    ) -> Self {
        let views = publisher.subscribe();
        let ingestor = Self::start_ingestor(tracker, events, publisher);
        let reporter = Self::start_reporter(views);
        Self { ingestor, reporter }
    }

    fn start_ingestor(
        mut tracker: ConnectionTracker,
        mut events: mpsc::Receiver<IngestEvent>,
        publisher: watch::Sender<Arc<ConnectionViews>>,
    ) -> JoinHandle<ConnectionTracker> {
        tokio::spawn(async move {
            let mut ingested = 0u64;
            while let Some(event) = events.recv().await {
                match event {
                    IngestEvent::Snapshot(message) => {
                        ingested += 1;
                        if let Some(views) = tracker.ingest(message) {
                            publisher.send_replace(views);
                        }
                    }
                    IngestEvent::SetPaused(paused) => tracker.set_paused(paused),
                }
            }
            tracing::info!("Event channel closed after {ingested} snapshots");
            tracker
        })
    }

    fn start_reporter(views: watch::Receiver<Arc<ConnectionViews>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
                config::SUMMARY_INTERVAL_SECS,
            ));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let current = Arc::clone(&views.borrow());
                log_summary(&current);
            }
        })
    }

    /// Wait for the ingestor to drain, stop the reporter, and hand back the tracker.
    pub async fn shutdown(self) -> anyhow::Result<ConnectionTracker> {
        let tracker = self.ingestor.await.context("snapshot ingestor task failed")?;
        self.reporter.abort();
        Ok(tracker)
    }
}

/// Log counts, bucket speeds, and the busiest connections of `views`.
pub fn log_summary(views: &ConnectionViews) {
    let summary = summarize(views);
    let buckets: Vec<String> = views
        .virtual_connections
        .values()
        .map(|row| {
            format!(
                "{} \u{2193}{} \u{2191}{}",
                row.bucket.as_str(),
                format_speed_compact(row.download_speed as f64),
                format_speed_compact(row.upload_speed as f64)
            )
        })
        .collect();
    tracing::info!(
        "{} active, {} closed | {}",
        summary.active_count,
        summary.closed_count,
        buckets.join(" | ")
    );
    for conn in top_connections(&views.active, config::TOP_CONNECTIONS_COUNT) {
        if conn.total_speed() == 0 {
            break;
        }
        tracing::debug!(
            "  {}: \u{2193}{} \u{2191}{}",
            conn.id(),
            format_speed_compact(conn.download_speed as f64),
            format_speed_compact(conn.upload_speed as f64)
        );
    }
}

/// Format a speed value in a compact human-readable form.
pub fn format_speed_compact(bps: f64) -> String {
    if bps < 1024.0 {
        format!("{:.0} B/s", bps)
    } else if bps < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", bps / 1024.0)
    } else {
        format!("{:.2} MB/s", bps / (1024.0 * 1024.0))
    }
}
