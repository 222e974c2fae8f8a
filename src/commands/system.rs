//! Pause control and snapshot submission.
//!
//! Pause changes go through the same queue as snapshots, so a `pause` issued
//! after snapshot N freezes the views exactly at snapshot N.

use crate::core::SnapshotMessage;
use crate::error::AppError;
use crate::services::IngestEvent;

use super::logic::InputLine;
use super::state::AppState;

async fn enqueue(state: &AppState, event: IngestEvent) -> Result<(), AppError> {
    state
        .events
        .send(event)
        .await
        .map_err(|_| AppError::Channel("snapshot ingestor has stopped".into()))
}

// ---- Pause Gate ----

/// Queue a pause change behind every snapshot submitted before it.
pub async fn set_paused(state: &AppState, paused: bool) -> Result<(), AppError> {
    enqueue(state, IngestEvent::SetPaused(paused)).await
}

/// Pause state as last applied by the ingestor.
pub fn is_paused(state: &AppState) -> Result<bool, AppError> {
    Ok(state.pause.is_paused())
}

// ---- Snapshot Feed ----

/// Queue a snapshot for the ingestor. Waits when the channel is full so
/// snapshots are never reordered or dropped.
pub async fn submit_snapshot(state: &AppState, message: SnapshotMessage) -> Result<(), AppError> {
    enqueue(state, IngestEvent::Snapshot(message)).await
}

/// Route one decoded input line to the matching handler.
pub async fn apply_input_line(state: &AppState, line: InputLine) -> Result<(), AppError> {
    match line {
        InputLine::Blank => Ok(()),
        InputLine::Pause => set_paused(state, true).await,
        InputLine::Resume => set_paused(state, false).await,
        InputLine::Snapshot(message) => submit_snapshot(state, message).await,
    }
}
