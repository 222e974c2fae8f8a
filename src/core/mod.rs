//! Core logic: connection reconciliation.
//!
//! - [`ConnectionTracker`] : owned store with the single `ingest` entry point
//! - [`speed`] : per-interval speed from cumulative counters
//! - [`history`] : bounded "all seen" window and closure detection
//! - [`aggregate`] : `Proxy` / `Direct` bucket rows
//! - [`PauseGate`] : publication pause flag

pub mod aggregate;
pub mod connection;
pub mod history;
pub mod pause;
pub mod speed;
pub mod traffic;

pub use connection::{
    Bucket, ConnectionViews, DerivedConnection, RawConnectionRecord, SnapshotMessage,
    VirtualConnection, VirtualConnections,
};
pub use pause::PauseGate;
pub use traffic::ConnectionTracker;
