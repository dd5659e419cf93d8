//! State module for tracking crawl runs
//!
//! # Components
//!
//! - `RunState`: lifecycle of a single run (idle, running, completed)
//! - `RunTracker`: accumulates per-source outcomes while a run is in progress

mod run_state;
mod tracker;

// Re-export main types
pub use run_state::RunState;
pub use tracker::RunTracker;
