//! Pure business logic functions used by the handlers and services.
//!
//! These functions take plain parameters (no channel or task dependency) and
//! can be unit-tested without a runtime.

use serde::Serialize;

use crate::core::{Bucket, ConnectionViews, DerivedConnection, SnapshotMessage};
use crate::error::AppError;

/// One decoded line of the newline-delimited input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    Blank,
    Pause,
    Resume,
    Snapshot(SnapshotMessage),
}

/// Totals and per-bucket speeds of one set of published views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    pub active_count: usize,
    pub closed_count: usize,
    pub upload_total: u64,
    pub download_total: u64,
    pub proxy_upload_speed: u64,
    pub proxy_download_speed: u64,
    pub direct_upload_speed: u64,
    pub direct_download_speed: u64,
}

/// Decode an input line: `pause` / `resume` control words or a JSON snapshot.
pub fn parse_input_line(line: &str) -> Result<InputLine, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(InputLine::Blank);
    }
    match line {
        "pause" => Ok(InputLine::Pause),
        "resume" => Ok(InputLine::Resume),
        _ => Ok(InputLine::Snapshot(serde_json::from_str(line)?)),
    }
}

/// The `limit` connections with the highest combined speed, fastest first.
pub fn top_connections(active: &[DerivedConnection], limit: usize) -> Vec<DerivedConnection> {
    let mut ranked: Vec<DerivedConnection> = active.to_vec();
    ranked.sort_by(|a, b| b.total_speed().cmp(&a.total_speed()));
    ranked.truncate(limit);
    ranked
}

/// Collapse published views into counts and per-bucket speeds.
pub fn summarize(views: &ConnectionViews) -> TrafficSummary {
    let speed = |bucket: Bucket| {
        views
            .virtual_connections
            .get(&bucket)
            .map(|row| (row.upload_speed, row.download_speed))
            .unwrap_or_default()
    };
    let (proxy_upload_speed, proxy_download_speed) = speed(Bucket::Proxy);
    let (direct_upload_speed, direct_download_speed) = speed(Bucket::Direct);

    TrafficSummary {
        active_count: views.active.len(),
        closed_count: views.closed.len(),
        upload_total: views.upload_total,
        download_total: views.download_total,
        proxy_upload_speed,
        proxy_download_speed,
        direct_upload_speed,
        direct_download_speed,
    }
}
