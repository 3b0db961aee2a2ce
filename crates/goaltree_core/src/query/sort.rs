//! Multi-criterion goal ordering.
//!
//! # Invariants
//! - Every sort is stable: ties keep their input order.
//! - `Deadline` puts goals without a deadline after all dated goals.
//! - `None` returns the input order unchanged.

use crate::model::goal::{Goal, GoalMap};
use crate::query::progress::compute_progress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Sort key chosen for one goal list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Keep input order.
    #[default]
    None,
    /// Ascending sibling `order`.
    Order,
    /// Ascending deadline, undated last.
    Deadline,
    /// Descending importance.
    Importance,
    /// Ascending recursive progress.
    Progress,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Order => "order",
            Self::Deadline => "deadline",
            Self::Importance => "importance",
            Self::Progress => "progress",
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sort key label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortKeyError(pub String);

impl Display for ParseSortKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported sort key `{}`; expected none|order|deadline|importance|progress",
            self.0
        )
    }
}

impl Error for ParseSortKeyError {}

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "order" => Ok(Self::Order),
            "deadline" => Ok(Self::Deadline),
            "importance" => Ok(Self::Importance),
            "progress" => Ok(Self::Progress),
            other => Err(ParseSortKeyError(other.to_string())),
        }
    }
}

/// Returns `goals` stably sorted by `key`.
///
/// `map` is only consulted for `SortKey::Progress`.
pub fn sort_goals<'a>(goals: &[&'a Goal], map: &GoalMap, key: SortKey) -> Vec<&'a Goal> {
    let mut sorted = goals.to_vec();
    match key {
        SortKey::None => {}
        SortKey::Order => sorted.sort_by_key(|goal| goal.order),
        SortKey::Deadline => sort_by_deadline(&mut sorted),
        SortKey::Importance => sorted.sort_by(|a, b| b.importance.cmp(&a.importance)),
        SortKey::Progress => {
            let mut keyed: Vec<(f64, &'a Goal)> = sorted
                .iter()
                .map(|goal| (compute_progress(map, &goal.id), *goal))
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            sorted = keyed.into_iter().map(|(_, goal)| goal).collect();
        }
    }
    sorted
}

/// Stable ascending-deadline sort with undated goals last.
pub fn sort_by_deadline(goals: &mut [&Goal]) {
    goals.sort_by(|a, b| compare_deadlines(a.deadline, b.deadline));
}

fn compare_deadlines(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
