//! Session-level use cases over the goal store.
//!
//! # Responsibility
//! - Pair the in-memory store with write-through persistence.
//! - Keep presentation code decoupled from storage details.

pub mod goal_service;
