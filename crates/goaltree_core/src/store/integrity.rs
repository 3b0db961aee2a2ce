//! Forest invariants over a `GoalMap`.
//!
//! # Responsibility
//! - Detect violations of referential integrity, bidirectional links, root
//!   closure and acyclicity.
//! - Repair loaded data in place so one bad record never poisons the map.
//!
//! # Invariants
//! - `verify` is read-only and reports every violation it finds.
//! - `repair` never deletes a goal; it only edits relationship fields.
//! - After `repair`, `verify` returns an empty list.

use crate::model::goal::{GoalId, GoalMap};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// One broken forest invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Map key and the record's own id disagree.
    KeyMismatch { key: GoalId, id: GoalId },
    /// `child_ids` references a goal that does not exist.
    DanglingChild { parent: GoalId, child: GoalId },
    /// `child_ids` lists the same child more than once.
    DuplicateChild { parent: GoalId, child: GoalId },
    /// `child_ids` lists a goal whose `parent_id` points elsewhere.
    ForeignChild {
        parent: GoalId,
        child: GoalId,
        actual_parent: Option<GoalId>,
    },
    /// A goal names a parent that does not list it as a child.
    MissingBackLink { parent: GoalId, child: GoalId },
    /// A goal names a parent that does not exist.
    MissingParent { goal: GoalId, parent: GoalId },
    /// Following `parent_id` from this goal loops back onto the chain.
    Cycle { goal: GoalId },
}

impl Display for IntegrityViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyMismatch { key, id } => write!(f, "map key {key} holds goal {id}"),
            Self::DanglingChild { parent, child } => {
                write!(f, "goal {parent} lists missing child {child}")
            }
            Self::DuplicateChild { parent, child } => {
                write!(f, "goal {parent} lists child {child} more than once")
            }
            Self::ForeignChild {
                parent,
                child,
                actual_parent,
            } => match actual_parent {
                Some(actual) => write!(
                    f,
                    "goal {parent} lists child {child} whose parent is {actual}"
                ),
                None => write!(f, "goal {parent} lists root goal {child} as child"),
            },
            Self::MissingBackLink { parent, child } => {
                write!(f, "goal {child} names parent {parent} which does not list it")
            }
            Self::MissingParent { goal, parent } => {
                write!(f, "goal {goal} names missing parent {parent}")
            }
            Self::Cycle { goal } => write!(f, "goal {goal} is its own ancestor"),
        }
    }
}

/// Returns every invariant violation in `map`.
pub fn verify(map: &GoalMap) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();

    for (key, goal) in map {
        if *key != goal.id {
            violations.push(IntegrityViolation::KeyMismatch {
                key: key.clone(),
                id: goal.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for child_id in &goal.child_ids {
            if !seen.insert(child_id) {
                violations.push(IntegrityViolation::DuplicateChild {
                    parent: key.clone(),
                    child: child_id.clone(),
                });
                continue;
            }
            match map.get(child_id) {
                None => violations.push(IntegrityViolation::DanglingChild {
                    parent: key.clone(),
                    child: child_id.clone(),
                }),
                Some(child) if child.parent_id.as_ref() != Some(key) => {
                    violations.push(IntegrityViolation::ForeignChild {
                        parent: key.clone(),
                        child: child_id.clone(),
                        actual_parent: child.parent_id.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        if let Some(parent_id) = &goal.parent_id {
            match map.get(parent_id) {
                None => violations.push(IntegrityViolation::MissingParent {
                    goal: key.clone(),
                    parent: parent_id.clone(),
                }),
                Some(parent) if !parent.child_ids.contains(key) => {
                    violations.push(IntegrityViolation::MissingBackLink {
                        parent: parent_id.clone(),
                        child: key.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    violations.extend(
        find_cycle_entries(map)
            .into_iter()
            .map(|goal| IntegrityViolation::Cycle { goal }),
    );
    violations
}

/// Restores forest invariants in place and reports what was changed.
///
/// Repairs, in order: key/id mismatches, bad `child_ids` entries, missing
/// parents (promoted to root), missing back-links, then cycles (the goal
/// where the loop is detected is promoted to root).
pub fn repair(map: &mut GoalMap) -> Vec<IntegrityViolation> {
    let mut repairs = Vec::new();

    for (key, goal) in map.iter_mut() {
        if *key != goal.id {
            repairs.push(IntegrityViolation::KeyMismatch {
                key: key.clone(),
                id: goal.id.clone(),
            });
            goal.id = key.clone();
        }
    }

    let parent_of: Vec<(GoalId, Option<GoalId>)> = map
        .iter()
        .map(|(id, goal)| (id.clone(), goal.parent_id.clone()))
        .collect();
    let parent_lookup: HashMap<&GoalId, Option<&GoalId>> = parent_of
        .iter()
        .map(|(id, parent_id)| (id, parent_id.as_ref()))
        .collect();

    for (key, goal) in map.iter_mut() {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(goal.child_ids.len());
        for child_id in goal.child_ids.drain(..) {
            if !seen.insert(child_id.clone()) {
                repairs.push(IntegrityViolation::DuplicateChild {
                    parent: key.clone(),
                    child: child_id,
                });
                continue;
            }
            let Some(actual_parent) = parent_lookup.get(&child_id) else {
                repairs.push(IntegrityViolation::DanglingChild {
                    parent: key.clone(),
                    child: child_id,
                });
                continue;
            };
            if *actual_parent != Some(key) {
                repairs.push(IntegrityViolation::ForeignChild {
                    parent: key.clone(),
                    child: child_id,
                    actual_parent: actual_parent.cloned(),
                });
                continue;
            }
            kept.push(child_id);
        }
        goal.child_ids = kept;
    }

    for (id, parent_id) in &parent_of {
        let Some(parent_id) = parent_id else {
            continue;
        };
        if !parent_lookup.contains_key(parent_id) {
            repairs.push(IntegrityViolation::MissingParent {
                goal: id.clone(),
                parent: parent_id.clone(),
            });
            if let Some(goal) = map.get_mut(id) {
                goal.parent_id = None;
            }
            continue;
        }
        if let Some(parent) = map.get_mut(parent_id) {
            if !parent.child_ids.contains(id) {
                repairs.push(IntegrityViolation::MissingBackLink {
                    parent: parent_id.clone(),
                    child: id.clone(),
                });
                parent.child_ids.push(id.clone());
            }
        }
    }

    loop {
        let entries = find_cycle_entries(map);
        if entries.is_empty() {
            break;
        }
        for goal_id in entries {
            detach(map, &goal_id);
            repairs.push(IntegrityViolation::Cycle { goal: goal_id });
        }
    }

    repairs
}

fn detach(map: &mut GoalMap, goal_id: &GoalId) {
    let parent_id = match map.get_mut(goal_id) {
        Some(goal) => goal.parent_id.take(),
        None => None,
    };
    if let Some(parent) = parent_id.and_then(|parent_id| map.get_mut(&parent_id)) {
        parent.child_ids.retain(|child_id| child_id != goal_id);
    }
}

/// Returns one goal per parent-chain loop: the first revisited goal.
fn find_cycle_entries(map: &GoalMap) -> Vec<GoalId> {
    let mut settled: HashSet<&GoalId> = HashSet::new();
    let mut entries = Vec::new();

    for start in map.keys() {
        if settled.contains(start) {
            continue;
        }
        let mut on_path: HashSet<&GoalId> = HashSet::new();
        let mut cursor = Some(start);
        while let Some(current) = cursor {
            if settled.contains(current) {
                break;
            }
            if !on_path.insert(current) {
                entries.push(current.clone());
                break;
            }
            cursor = map
                .get(current)
                .and_then(|goal| goal.parent_id.as_ref())
                .filter(|parent_id| map.contains_key(*parent_id));
        }
        settled.extend(on_path);
    }

    entries
}
