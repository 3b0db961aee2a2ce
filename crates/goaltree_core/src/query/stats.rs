//! Aggregate statistics over every goal in the map.
//!
//! # Invariants
//! - Counts cover all goals, not only roots or leaves.
//! - `by_importance` always carries keys `1..=5`, zero when unused.
//! - A tag counts once per goal even if the goal lists it twice.
//! - Weekly/monthly completion counts stay `0`: goals record no completion
//!   timestamp to derive them from.

use crate::model::goal::{GoalMap, MAX_IMPORTANCE, MIN_IMPORTANCE};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Dashboard figures derived from a goal map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalStatistics {
    pub total_goals: usize,
    pub completed_goals: usize,
    /// Open goals whose deadline already passed.
    pub overdue_goals: usize,
    /// Percentage of completed goals, rounded to two decimals. `0.0` when empty.
    pub completion_rate: f64,
    pub by_importance: BTreeMap<u8, usize>,
    pub by_tag: BTreeMap<String, usize>,
    pub completed_this_week: usize,
    pub completed_this_month: usize,
}

/// Aggregates statistics with overdue status evaluated at `now`.
pub fn calculate_statistics_at(map: &GoalMap, now: DateTime<Utc>) -> GoalStatistics {
    let mut by_importance: BTreeMap<u8, usize> =
        (MIN_IMPORTANCE..=MAX_IMPORTANCE).map(|level| (level, 0)).collect();
    let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
    let mut completed_goals = 0;
    let mut overdue_goals = 0;

    for goal in map.values() {
        if goal.is_done {
            completed_goals += 1;
        }
        if goal.is_overdue_at(now) {
            overdue_goals += 1;
        }
        *by_importance.entry(goal.importance).or_insert(0) += 1;

        let distinct: BTreeSet<&String> = goal.tags.iter().collect();
        for tag in distinct {
            *by_tag.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    let total_goals = map.len();
    let completion_rate = if total_goals == 0 {
        0.0
    } else {
        round_to_hundredths(completed_goals as f64 / total_goals as f64 * 100.0)
    };

    GoalStatistics {
        total_goals,
        completed_goals,
        overdue_goals,
        completion_rate,
        by_importance,
        by_tag,
        completed_this_week: 0,
        completed_this_month: 0,
    }
}

/// Same as [`calculate_statistics_at`] against the wall clock.
pub fn calculate_statistics(map: &GoalMap) -> GoalStatistics {
    calculate_statistics_at(map, Utc::now())
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
