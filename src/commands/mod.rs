//! Handlers over the engine, organized by functional domain.
//!
//! - `traffic`: active / closed / bucket views, summary, top connections
//! - `system`: pause control and snapshot submission
//! - `logic`: Pure business logic functions (unit-testable)
//! - `state`: Shared `AppState` definition

pub(crate) mod logic;
mod state;
pub mod system;
pub mod traffic;

pub use logic::{InputLine, TrafficSummary};
pub use state::AppState;
