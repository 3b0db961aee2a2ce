//! Domain model for the goal hierarchy.
//!
//! # Responsibility
//! - Define the canonical goal record and its keyed container.
//! - Keep editor input shapes (`GoalDraft`, `GoalPatch`) next to the entity.
//!
//! # Invariants
//! - Every goal is identified by a stable `GoalId`.
//! - Deletion is a hard, recursive removal; there are no tombstones.

pub mod goal;
