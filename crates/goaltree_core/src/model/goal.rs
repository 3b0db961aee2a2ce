//! Goal domain model.
//!
//! # Responsibility
//! - Define the single entity of the goal hierarchy and its map container.
//! - Validate editor-facing input (`GoalDraft`, `GoalPatch`) before it
//!   reaches the store.
//!
//! # Invariants
//! - `id` is immutable after creation and never reused for another goal.
//! - Committed input keeps `importance` within `MIN_IMPORTANCE..=MAX_IMPORTANCE`.
//! - `order` is meaningful only inside one sibling group.
//! - Relationship fields (`parent_id`, `child_ids`) are owned by the store and
//!   cannot be expressed through `GoalPatch`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Lowest accepted importance.
pub const MIN_IMPORTANCE: u8 = 1;
/// Highest accepted importance.
pub const MAX_IMPORTANCE: u8 = 5;
/// Importance used when the caller does not pick one.
pub const DEFAULT_IMPORTANCE: u8 = 3;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Opaque, stable goal identifier.
///
/// Fresh ids are UUID v7 text, so their lexical order follows creation time.
/// Ids of any other shape (legacy data) are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GoalId(String);

impl GoalId {
    /// Allocates a new unique id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for GoalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GoalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GoalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for GoalId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// The whole goal state, keyed by id.
pub type GoalMap = BTreeMap<GoalId, Goal>;

/// One node of the goal forest.
///
/// Field names serialize in camelCase to match the persisted record shape.
/// Decoding goes through `repo::goal_codec`, which tolerates legacy records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalId,
    /// Display text. Empty only while a goal is being edited.
    pub name: String,
    /// `None` for root goals.
    pub parent_id: Option<GoalId>,
    /// Direct children in insertion order.
    pub child_ids: Vec<GoalId>,
    pub is_done: bool,
    pub importance: u8,
    #[serde(serialize_with = "serialize_instant")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_instant")]
    pub deadline: Option<DateTime<Utc>>,
    /// Display-only flag, persisted but never used by computations.
    pub is_expanded: bool,
    pub tags: Vec<String>,
    /// Sort key among siblings.
    pub order: i64,
}

impl Goal {
    /// Builds a fresh goal from validated draft input.
    ///
    /// # Invariants
    /// - `child_ids` starts empty, `is_done` starts `false`.
    /// - `is_expanded` starts `true` so new subtrees are visible.
    pub fn from_draft(id: GoalId, parent_id: Option<GoalId>, draft: GoalDraft, order: i64) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            parent_id,
            child_ids: Vec::new(),
            is_done: false,
            importance: draft.importance,
            start_date: draft.start_date,
            deadline: draft.deadline,
            is_expanded: true,
            tags: draft.tags,
            order,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value == tag)
    }

    /// Returns whether the deadline passed before `now` while still open.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_done && self.deadline.is_some_and(|deadline| deadline < now)
    }

    /// Same as [`Goal::is_overdue_at`] against the wall clock.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }
}

/// Validation failures for editor-facing goal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValidationError {
    /// Name is empty after trim.
    BlankName,
    /// Importance is outside the accepted range.
    ImportanceOutOfRange(u8),
}

impl Display for GoalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "goal name must not be blank"),
            Self::ImportanceOutOfRange(value) => write!(
                f,
                "importance {value} is outside {MIN_IMPORTANCE}..={MAX_IMPORTANCE}"
            ),
        }
    }
}

impl Error for GoalValidationError {}

/// Attributes for a goal that is about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDraft {
    pub name: String,
    pub importance: u8,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl GoalDraft {
    /// Creates a draft with default importance and no dates or tags.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            importance: DEFAULT_IMPORTANCE,
            start_date: None,
            deadline: None,
            tags: Vec::new(),
        }
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), GoalValidationError> {
        validate_name(&self.name)?;
        validate_importance(self.importance)
    }
}

/// Partial update for one goal.
///
/// `None` leaves a field untouched. Date fields use a nested option so a
/// caller can clear a date (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub is_done: Option<bool>,
    pub importance: Option<u8>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub is_expanded: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub order: Option<i64>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), GoalValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(importance) = self.importance {
            validate_importance(importance)?;
        }
        Ok(())
    }

    /// Merges set fields into `goal`.
    pub fn apply_to(self, goal: &mut Goal) {
        if let Some(name) = self.name {
            goal.name = name.trim().to_string();
        }
        if let Some(is_done) = self.is_done {
            goal.is_done = is_done;
        }
        if let Some(importance) = self.importance {
            goal.importance = importance;
        }
        if let Some(start_date) = self.start_date {
            goal.start_date = start_date;
        }
        if let Some(deadline) = self.deadline {
            goal.deadline = deadline;
        }
        if let Some(is_expanded) = self.is_expanded {
            goal.is_expanded = is_expanded;
        }
        if let Some(tags) = self.tags {
            goal.tags = tags;
        }
        if let Some(order) = self.order {
            goal.order = order;
        }
    }
}

fn validate_name(name: &str) -> Result<(), GoalValidationError> {
    if name.trim().is_empty() {
        return Err(GoalValidationError::BlankName);
    }
    Ok(())
}

fn validate_importance(importance: u8) -> Result<(), GoalValidationError> {
    if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&importance) {
        return Err(GoalValidationError::ImportanceOutOfRange(importance));
    }
    Ok(())
}

/// Normalizes one tag: trims, strips leading `#`, collapses inner whitespace.
///
/// Returns `None` when nothing remains.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let stripped = raw.trim().trim_start_matches('#').trim();
    let collapsed = WHITESPACE_RE.replace_all(stripped, " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Normalizes and deduplicates tags, keeping first occurrence order.
pub fn normalize_tags<I, T>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|value| normalize_tag(value.as_ref()))
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Parses an ISO-8601 instant.
///
/// Accepts RFC 3339 (any offset, converted to UTC) and naive
/// `YYYY-MM-DD[THH:MM[:SS[.fff]]]` text read as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Formats an instant the way it is persisted (`2024-05-01T09:30:00.000Z`).
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn serialize_instant<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(instant) => serializer.serialize_str(&format_instant(instant)),
        None => serializer.serialize_none(),
    }
}
