//! Read-only handlers over the published connection views.

use crate::core::{DerivedConnection, VirtualConnections};
use crate::error::AppError;

use super::logic::{summarize, top_connections, TrafficSummary};
use super::state::AppState;

/// Returns the currently open connections with their speeds.
pub fn get_active_connections(state: &AppState) -> Result<Vec<DerivedConnection>, AppError> {
    Ok(state.current_views().active.clone())
}

/// Returns the most recent closures, oldest first.
pub fn get_closed_connections(state: &AppState) -> Result<Vec<DerivedConnection>, AppError> {
    Ok(state.current_views().closed.clone())
}

/// Returns the `Proxy` / `Direct` bucket rows seen so far.
pub fn get_virtual_connections(state: &AppState) -> Result<VirtualConnections, AppError> {
    Ok(state.current_views().virtual_connections.clone())
}

pub fn get_traffic_summary(state: &AppState) -> Result<TrafficSummary, AppError> {
    Ok(summarize(&state.current_views()))
}

/// Get the `limit` busiest active connections.
pub fn get_top_connections(
    state: &AppState,
    limit: usize,
) -> Result<Vec<DerivedConnection>, AppError> {
    if limit == 0 {
        return Err(AppError::InvalidInput("limit must be greater than zero".into()));
    }
    Ok(top_connections(&state.current_views().active, limit))
}
