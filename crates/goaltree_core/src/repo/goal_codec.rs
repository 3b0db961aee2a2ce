//! JSON codec for the persisted goal map.
//!
//! # Responsibility
//! - Encode a `GoalMap` as one JSON object keyed by goal id.
//! - Decode leniently: a bad field or record degrades that record only.
//!
//! # Invariants
//! - Instants are written as ISO-8601 text with millisecond precision.
//! - Missing `tags` / `order` (older data) default to `[]` / `0` silently.
//! - The map key is the goal id; a conflicting inner `id` is overridden.
//! - Decoded maps satisfy forest invariants; every repair is reported.

use crate::model::goal::{
    parse_instant, Goal, GoalId, GoalMap, DEFAULT_IMPORTANCE, MAX_IMPORTANCE, MIN_IMPORTANCE,
};
use crate::store::integrity::{self, IntegrityViolation};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Largest `order` magnitude kept from stored data: the biggest integer a
/// JSON number holds exactly.
const MAX_STORED_ORDER: i64 = (1 << 53) - 1;

/// Errors that make the whole persisted value unusable.
#[derive(Debug)]
pub enum CodecError {
    /// Stored text is not valid JSON.
    InvalidJson(serde_json::Error),
    /// Stored JSON is valid but not an object.
    NotAnObject(&'static str),
    /// Map could not be serialized.
    Encode(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "persisted goals are not valid JSON: {err}"),
            Self::NotAnObject(kind) => {
                write!(f, "persisted goals must be a JSON object, got {kind}")
            }
            Self::Encode(err) => write!(f, "failed to encode goals: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) | Self::Encode(err) => Some(err),
            Self::NotAnObject(_) => None,
        }
    }
}

/// One per-record degradation observed while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadIssue {
    /// Record was not an object and was skipped.
    RecordDropped { key: String, reason: String },
    /// Field had an unexpected shape and fell back to its default.
    FieldDefaulted { goal: GoalId, field: &'static str },
    /// Relationship fields were repaired after decoding.
    Repaired(IntegrityViolation),
}

impl Display for LoadIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecordDropped { key, reason } => write!(f, "dropped record {key}: {reason}"),
            Self::FieldDefaulted { goal, field } => {
                write!(f, "goal {goal}: field `{field}` reset to default")
            }
            Self::Repaired(violation) => write!(f, "repaired: {violation}"),
        }
    }
}

/// Summary of one decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Goals present in the decoded map.
    pub loaded: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.count(|issue| matches!(issue, LoadIssue::RecordDropped { .. }))
    }

    pub fn defaulted(&self) -> usize {
        self.count(|issue| matches!(issue, LoadIssue::FieldDefaulted { .. }))
    }

    pub fn repaired(&self) -> usize {
        self.count(|issue| matches!(issue, LoadIssue::Repaired(_)))
    }

    fn count(&self, predicate: impl Fn(&LoadIssue) -> bool) -> usize {
        self.issues.iter().filter(|issue| predicate(issue)).count()
    }
}

/// Serializes the whole map as a JSON object.
pub fn encode_goal_map(map: &GoalMap) -> Result<String, CodecError> {
    serde_json::to_string(map).map_err(CodecError::Encode)
}

/// Parses a persisted JSON object into a consistent `GoalMap`.
///
/// # Errors
/// - `InvalidJson` / `NotAnObject` when the value as a whole is unusable.
///   Individual bad records never fail the decode.
pub fn decode_goal_map(raw: &str) -> Result<(GoalMap, LoadReport), CodecError> {
    let value: Value = serde_json::from_str(raw).map_err(CodecError::InvalidJson)?;
    let Value::Object(records) = value else {
        return Err(CodecError::NotAnObject(json_kind(&value)));
    };

    let mut report = LoadReport::default();
    let mut map = GoalMap::new();
    for (key, record) in &records {
        if let Some(goal) = decode_record(key, record, &mut report.issues) {
            map.insert(goal.id.clone(), goal);
        }
    }

    report.issues.extend(
        integrity::repair(&mut map)
            .into_iter()
            .map(LoadIssue::Repaired),
    );
    report.loaded = map.len();
    Ok((map, report))
}

fn decode_record(key: &str, record: &Value, issues: &mut Vec<LoadIssue>) -> Option<Goal> {
    let Value::Object(fields) = record else {
        issues.push(LoadIssue::RecordDropped {
            key: key.to_string(),
            reason: format!("expected object, got {}", json_kind(record)),
        });
        return None;
    };

    let mut reader = RecordReader {
        id: GoalId::from(key),
        fields,
        issues,
    };
    if reader.fields.get("id").and_then(Value::as_str) != Some(key) {
        reader.defaulted("id");
    }

    Some(Goal {
        name: reader.text("name"),
        parent_id: reader.parent_id(),
        child_ids: reader
            .strings("childIds", false)
            .into_iter()
            .map(GoalId::from)
            .collect(),
        is_done: reader.flag("isDone", false),
        importance: reader.importance(),
        start_date: reader.instant("startDate"),
        deadline: reader.instant("deadline"),
        is_expanded: reader.flag("isExpanded", true),
        tags: reader.strings("tags", true),
        order: reader.order(),
        id: reader.id,
    })
}

/// Field accessors that fall back to defaults and log each fallback.
struct RecordReader<'a> {
    id: GoalId,
    fields: &'a Map<String, Value>,
    issues: &'a mut Vec<LoadIssue>,
}

impl<'a> RecordReader<'a> {
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field)
    }

    fn defaulted(&mut self, field: &'static str) {
        self.issues.push(LoadIssue::FieldDefaulted {
            goal: self.id.clone(),
            field,
        });
    }

    fn text(&mut self, field: &'static str) -> String {
        match self.get(field) {
            Some(Value::String(value)) => value.clone(),
            _ => {
                self.defaulted(field);
                String::new()
            }
        }
    }

    fn flag(&mut self, field: &'static str, default: bool) -> bool {
        match self.get(field) {
            Some(Value::Bool(value)) => *value,
            _ => {
                self.defaulted(field);
                default
            }
        }
    }

    fn parent_id(&mut self) -> Option<GoalId> {
        match self.get("parentId") {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) if value.is_empty() => None,
            Some(Value::String(value)) => Some(GoalId::from(value.as_str())),
            Some(_) => {
                self.defaulted("parentId");
                None
            }
        }
    }

    /// Reads an array of strings, dropping non-string items.
    fn strings(&mut self, field: &'static str, missing_ok: bool) -> Vec<String> {
        match self.get(field) {
            None if missing_ok => Vec::new(),
            Some(Value::Array(items)) => {
                let values: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                if values.len() != items.len() {
                    self.defaulted(field);
                }
                values
            }
            _ => {
                self.defaulted(field);
                Vec::new()
            }
        }
    }

    fn importance(&mut self) -> u8 {
        let raw = self.get("importance").and_then(json_integer);
        match raw {
            Some(value) if (i64::from(MIN_IMPORTANCE)..=i64::from(MAX_IMPORTANCE)).contains(&value) => {
                value as u8
            }
            Some(value) => {
                self.defaulted("importance");
                value.clamp(i64::from(MIN_IMPORTANCE), i64::from(MAX_IMPORTANCE)) as u8
            }
            None => {
                self.defaulted("importance");
                DEFAULT_IMPORTANCE
            }
        }
    }

    fn instant(&mut self, field: &'static str) -> Option<DateTime<Utc>> {
        let parsed = match self.get(field) {
            None | Some(Value::Null) => return None,
            Some(Value::String(text)) => parse_instant(text),
            Some(Value::Number(number)) => number
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
            Some(_) => None,
        };
        if parsed.is_none() {
            self.defaulted(field);
        }
        parsed
    }

    fn order(&mut self) -> i64 {
        match self.get("order") {
            None => 0,
            Some(value) => match json_integer(value) {
                Some(order) if (-MAX_STORED_ORDER..=MAX_STORED_ORDER).contains(&order) => order,
                Some(order) => {
                    self.defaulted("order");
                    order.clamp(-MAX_STORED_ORDER, MAX_STORED_ORDER)
                }
                None => {
                    self.defaulted("order");
                    0
                }
            },
        }
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|number| number.is_finite())
            .map(|number| number.round() as i64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_goal_map, encode_goal_map, CodecError, LoadIssue};
    use crate::model::goal::{GoalId, DEFAULT_IMPORTANCE};

    #[test]
    fn legacy_record_without_tags_or_order_loads_clean() {
        let raw = r#"{
            "abc123xyz": {
                "id": "abc123xyz",
                "name": "Legacy",
                "parentId": null,
                "childIds": [],
                "isDone": false,
                "importance": 4,
                "startDate": null,
                "deadline": "2024-03-01T10:00:00.000Z",
                "isExpanded": true
            }
        }"#;
        let (map, report) = decode_goal_map(raw).unwrap();
        assert!(report.is_clean(), "{:?}", report.issues);
        let goal = &map["abc123xyz"];
        assert!(goal.tags.is_empty());
        assert_eq!(goal.order, 0);
        assert_eq!(goal.importance, 4);
        assert!(goal.deadline.is_some());
    }

    #[test]
    fn bad_fields_degrade_one_record_only() {
        let raw = r#"{
            "good": {"id": "good", "name": "Good", "parentId": null, "childIds": [],
                     "isDone": true, "importance": 2, "startDate": null, "deadline": null,
                     "isExpanded": false, "tags": ["a"], "order": 3},
            "odd": {"id": "odd", "name": 42, "parentId": null, "childIds": "nope",
                    "isDone": "yes", "importance": 9, "deadline": "someday",
                    "isExpanded": true, "tags": ["b", 7], "order": "first"},
            "junk": 17
        }"#;
        let (map, report) = decode_goal_map(raw).unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.dropped(), 1);
        let good = &map["good"];
        assert!(good.is_done);
        assert_eq!(good.order, 3);
        assert!(!good.is_expanded);

        let odd = &map["odd"];
        assert_eq!(odd.name, "");
        assert!(odd.child_ids.is_empty());
        assert!(!odd.is_done);
        assert_eq!(odd.importance, 5);
        assert_eq!(odd.deadline, None);
        assert_eq!(odd.tags, vec!["b".to_string()]);
        assert_eq!(odd.order, 0);
        assert!(report.issues.contains(&LoadIssue::FieldDefaulted {
            goal: GoalId::from("odd"),
            field: "deadline",
        }));
    }

    #[test]
    fn missing_importance_uses_default() {
        let raw = r#"{"g": {"id": "g", "name": "G", "childIds": [], "isDone": false, "isExpanded": true}}"#;
        let (map, report) = decode_goal_map(raw).unwrap();
        assert_eq!(map["g"].importance, DEFAULT_IMPORTANCE);
        assert_eq!(report.defaulted(), 1);
    }

    #[test]
    fn out_of_range_order_is_clamped() {
        let raw = r#"{
            "big": {"id": "big", "name": "Big", "parentId": null, "childIds": [],
                    "isDone": false, "importance": 3, "isExpanded": true,
                    "order": 9223372036854775807},
            "tiny": {"id": "tiny", "name": "Tiny", "parentId": null, "childIds": [],
                     "isDone": false, "importance": 3, "isExpanded": true,
                     "order": -1e300}
        }"#;
        let (map, report) = decode_goal_map(raw).unwrap();
        assert_eq!(map[&GoalId::from("big")].order, (1 << 53) - 1);
        assert_eq!(map[&GoalId::from("tiny")].order, -((1 << 53) - 1));
        assert_eq!(report.defaulted(), 2);
        assert!(report.issues.contains(&LoadIssue::FieldDefaulted {
            goal: GoalId::from("big"),
            field: "order",
        }));
    }

    #[test]
    fn whole_value_errors() {
        assert!(matches!(
            decode_goal_map("{not json"),
            Err(CodecError::InvalidJson(_))
        ));
        assert!(matches!(
            decode_goal_map("[1, 2]"),
            Err(CodecError::NotAnObject("array"))
        ));
    }

    #[test]
    fn encode_uses_goal_ids_as_keys() {
        let raw = r#"{"g": {"id": "g", "name": "G", "parentId": null, "childIds": [],
                     "isDone": false, "importance": 3, "startDate": null, "deadline": null,
                     "isExpanded": true, "tags": [], "order": 0}}"#;
        let (map, _) = decode_goal_map(raw).unwrap();
        let encoded = encode_goal_map(&map).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["g"]["name"], "G");
        assert_eq!(value["g"]["parentId"], serde_json::Value::Null);
    }
}
