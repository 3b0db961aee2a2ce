//! Search/filter predicate over goal lists.
//!
//! # Invariants
//! - A goal passes iff every active criterion matches.
//! - Tag criteria use OR semantics: any shared tag passes.
//! - `filter_goals` looks only at the goals it is given; descendants are
//!   considered only by `filter_goal_trees`.

use crate::model::goal::{Goal, GoalMap};
use crate::store::traversal::subtree_ids;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Active search/filter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Case-insensitive substring of `name`; empty disables.
    pub search_text: String,
    /// Any-of tag set; empty disables.
    pub tags: Vec<String>,
    pub is_done: Option<bool>,
    pub importance: Option<u8>,
    /// Only open goals whose deadline already passed.
    pub overdue_only: bool,
}

impl FilterCriteria {
    /// Returns whether any criterion would exclude goals.
    pub fn is_active(&self) -> bool {
        !self.search_text.is_empty()
            || !self.tags.is_empty()
            || self.is_done.is_some()
            || self.importance.is_some()
            || self.overdue_only
    }

    /// Resets every criterion.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Adds `tag` when absent, removes it when present.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(position) = self.tags.iter().position(|value| value == tag) {
            self.tags.remove(position);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn matches_at(&self, goal: &Goal, now: DateTime<Utc>) -> bool {
        if !self.search_text.is_empty()
            && !goal
                .name
                .to_lowercase()
                .contains(&self.search_text.to_lowercase())
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| goal.has_tag(tag)) {
            return false;
        }
        if self.is_done.is_some_and(|is_done| goal.is_done != is_done) {
            return false;
        }
        if self
            .importance
            .is_some_and(|importance| goal.importance != importance)
        {
            return false;
        }
        if self.overdue_only && !goal.is_overdue_at(now) {
            return false;
        }
        true
    }

    pub fn matches(&self, goal: &Goal) -> bool {
        self.matches_at(goal, Utc::now())
    }
}

/// Keeps the goals that match `criteria` at `now`, preserving order.
pub fn filter_goals_at<'a>(
    goals: &[&'a Goal],
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Vec<&'a Goal> {
    goals
        .iter()
        .copied()
        .filter(|goal| criteria.matches_at(goal, now))
        .collect()
}

/// Same as [`filter_goals_at`] against the wall clock.
pub fn filter_goals<'a>(goals: &[&'a Goal], criteria: &FilterCriteria) -> Vec<&'a Goal> {
    filter_goals_at(goals, criteria, Utc::now())
}

/// Keeps each listed goal when it or any descendant matches.
///
/// Lets a search surface the root that contains a matching sub-goal.
pub fn filter_goal_trees<'a>(
    goals: &[&'a Goal],
    map: &GoalMap,
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Vec<&'a Goal> {
    goals
        .iter()
        .copied()
        .filter(|goal| {
            subtree_ids(map, &goal.id)
                .iter()
                .filter_map(|id| map.get(id))
                .any(|candidate| criteria.matches_at(candidate, now))
        })
        .collect()
}
