//! Recursive completion percentage.
//!
//! # Invariants
//! - A goal without children reports exactly `0.0` or `100.0`.
//! - A goal with children reports the arithmetic mean over all `child_ids`;
//!   a child id that does not resolve contributes `0.0`.
//! - Nothing is memoized: every call reads the current map.

use crate::model::goal::{GoalId, GoalMap};
use log::warn;
use std::collections::HashSet;

/// Nesting depth past which a subtree is treated as contributing `0.0`.
pub const MAX_PROGRESS_DEPTH: usize = 512;

/// Returns the completion percentage of `id` in `[0.0, 100.0]`.
///
/// Missing goals report `0.0`. A goal reached again on its own ancestor
/// chain (malformed input) contributes `0.0` instead of recursing.
pub fn compute_progress(map: &GoalMap, id: &GoalId) -> f64 {
    let mut on_path = HashSet::new();
    progress_at_depth(map, id, &mut on_path, 0)
}

fn progress_at_depth<'a>(
    map: &'a GoalMap,
    id: &'a GoalId,
    on_path: &mut HashSet<&'a GoalId>,
    depth: usize,
) -> f64 {
    let Some(goal) = map.get(id) else {
        return 0.0;
    };
    if goal.child_ids.is_empty() {
        return if goal.is_done { 100.0 } else { 0.0 };
    }
    if depth >= MAX_PROGRESS_DEPTH || !on_path.insert(id) {
        warn!(
            "event=progress_guard module=query status=error goal_id={} depth={}",
            id, depth
        );
        return 0.0;
    }

    let total: f64 = goal
        .child_ids
        .iter()
        .map(|child_id| progress_at_depth(map, child_id, on_path, depth + 1))
        .sum();
    on_path.remove(id);

    total / goal.child_ids.len() as f64
}
