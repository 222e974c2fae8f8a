//! Shared application state handed to every handler.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::core::{ConnectionViews, PauseGate};
use crate::services::IngestEvent;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Latest published views; readers only ever see whole snapshots.
    pub views: watch::Receiver<Arc<ConnectionViews>>,
    /// Publication pause flag, as last applied by the ingestor.
    pub pause: PauseGate,
    /// Inbound side of the ingestor queue: snapshots and pause changes, in order.
    pub events: mpsc::Sender<IngestEvent>,
}

impl AppState {
    /// Clone of the most recently published views.
    pub fn current_views(&self) -> Arc<ConnectionViews> {
        Arc::clone(&self.views.borrow())
    }
}
