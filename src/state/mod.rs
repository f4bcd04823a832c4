//! State module for tracking batch progress
//!
//! # Components
//!
//! - `CategoryState`: Per-category state machine (pending, in progress, learned, ...)
//! - `SiteState`: Per-site request pacing and rate-limit tracking
//! - `CheckpointRecord` / `CheckpointStore`: Durable list of finished categories

mod category_state;
mod checkpoint;
mod site_state;

// Re-export main types
pub use category_state::CategoryState;
pub use checkpoint::{CheckpointEntry, CheckpointRecord, CheckpointStore};
pub use site_state::SiteState;
