//! Goal store: the owned arena of goals and its invariant enforcement.
//!
//! # Responsibility
//! - Hold the authoritative `GoalMap` for one session.
//! - Expose the mutation operations callers use to change it.
//!
//! # Invariants
//! - No committed snapshot violates referential integrity or acyclicity.
//! - Traversals go through id lookups, never through object references.

pub mod goal_store;
pub mod integrity;
pub mod traversal;
