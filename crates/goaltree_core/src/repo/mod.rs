//! Persistence adapter for the goal map.
//!
//! # Responsibility
//! - Define the durable string-keyed store contract and its implementations.
//! - Translate between `GoalMap` and its persisted JSON value.
//!
//! # Invariants
//! - A malformed record degrades that record only, never the whole load.
//! - Loaded maps are repaired to satisfy forest invariants before use.

pub mod goal_codec;
pub mod goal_repo;
pub mod kv_store;
