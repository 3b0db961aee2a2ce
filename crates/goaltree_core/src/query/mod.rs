//! Read-only derivations over a goal map.
//!
//! # Responsibility
//! - Compute progress, selections, orderings, filters and statistics.
//! - Stay pure: every function reads the map it is handed and nothing else
//!   (apart from the wall clock in the `*_at`-less convenience variants).
//!
//! # Invariants
//! - Nothing here mutates or caches goal state.

pub mod filter;
pub mod progress;
pub mod select;
pub mod sort;
pub mod stats;
