//! Authoritative in-memory goal store and its mutation operations.
//!
//! # Responsibility
//! - Own the current `GoalMap` snapshot for one session.
//! - Apply create/update/delete/toggle/reorder as whole-snapshot replacements.
//!
//! # Invariants
//! - Every mutation runs on a working copy; the snapshot is swapped only after
//!   `integrity::verify` passes, so a failed call leaves the store untouched.
//! - `revision` increases by exactly one per committed mutation.
//! - New goals get `order = max(sibling order) + 1`, or `0` without siblings.
//! - `reorder` swaps `order` values between siblings and never renumbers.

use crate::model::goal::{Goal, GoalDraft, GoalId, GoalMap, GoalPatch, GoalValidationError};
use crate::store::integrity::{self, IntegrityViolation};
use crate::store::traversal::subtree_ids;
use log::{debug, error};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from goal store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Target goal does not exist.
    GoalNotFound(GoalId),
    /// Referenced parent goal does not exist.
    ParentNotFound(GoalId),
    /// Input failed editor validation.
    Validation(GoalValidationError),
    /// The sibling group already holds `i64::MAX` as an order value.
    OrderExhausted(Option<GoalId>),
    /// The resulting map would break forest invariants.
    Integrity(Vec<IntegrityViolation>),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoalNotFound(id) => write!(f, "goal not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "referenced parent not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::OrderExhausted(Some(parent_id)) => {
                write!(f, "no order value left under parent {parent_id}")
            }
            Self::OrderExhausted(None) => write!(f, "no order value left among root goals"),
            Self::Integrity(violations) => match violations.first() {
                Some(first) => write!(
                    f,
                    "goal map integrity violated ({} issue(s)), first: {first}",
                    violations.len()
                ),
                None => write!(f, "goal map integrity violated"),
            },
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GoalValidationError> for StoreError {
    fn from(value: GoalValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Result of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Sibling `order` values were exchanged.
    Swapped,
    /// Goals have different parents; nothing changed.
    NotSiblings,
    /// Dragged onto itself; nothing changed.
    SameGoal,
}

/// Snapshot-replacing goal store.
///
/// Readers may hold an `Arc<GoalMap>` from [`GoalStore::snapshot`] and
/// compare it with `Arc::ptr_eq` to detect change.
#[derive(Debug, Clone, Default)]
pub struct GoalStore {
    snapshot: Arc<GoalMap>,
    revision: u64,
}

impl GoalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing map after checking forest invariants.
    pub fn from_map(map: GoalMap) -> StoreResult<Self> {
        let violations = integrity::verify(&map);
        if !violations.is_empty() {
            return Err(StoreError::Integrity(violations));
        }
        Ok(Self {
            snapshot: Arc::new(map),
            revision: 0,
        })
    }

    /// Wraps an existing map, repairing it first. Returns applied repairs.
    pub fn from_map_repaired(mut map: GoalMap) -> (Self, Vec<IntegrityViolation>) {
        let repairs = integrity::repair(&mut map);
        let store = Self {
            snapshot: Arc::new(map),
            revision: 0,
        };
        (store, repairs)
    }

    pub fn goals(&self) -> &GoalMap {
        &self.snapshot
    }

    pub fn snapshot(&self) -> Arc<GoalMap> {
        Arc::clone(&self.snapshot)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &GoalId) -> Option<&Goal> {
        self.snapshot.get(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Creates one goal under optional parent.
    ///
    /// # Errors
    /// - `Validation` when the draft name is blank or importance is out of range.
    /// - `ParentNotFound` when `parent_id` is set but absent.
    pub fn create(&mut self, parent_id: Option<&GoalId>, draft: GoalDraft) -> StoreResult<Goal> {
        draft.validate()?;
        if let Some(parent_id) = parent_id {
            if !self.snapshot.contains_key(parent_id) {
                return Err(StoreError::ParentNotFound(parent_id.clone()));
            }
        }

        let mut working = self.working_copy();
        let order = next_sibling_order(&working, parent_id)?;
        let goal = Goal::from_draft(GoalId::generate(), parent_id.cloned(), draft, order);
        if let Some(parent) = parent_id.and_then(|parent_id| working.get_mut(parent_id)) {
            parent.child_ids.push(goal.id.clone());
        }
        working.insert(goal.id.clone(), goal.clone());

        self.commit(working)?;
        Ok(goal)
    }

    /// Merges `patch` into one goal and returns the updated record.
    pub fn update(&mut self, id: &GoalId, patch: GoalPatch) -> StoreResult<Goal> {
        if !self.snapshot.contains_key(id) {
            return Err(StoreError::GoalNotFound(id.clone()));
        }
        patch.validate()?;

        let mut working = self.working_copy();
        let goal = working
            .get_mut(id)
            .ok_or_else(|| StoreError::GoalNotFound(id.clone()))?;
        patch.apply_to(goal);
        let updated = goal.clone();

        self.commit(working)?;
        Ok(updated)
    }

    /// Removes one goal and its whole subtree.
    ///
    /// Returns removed ids in depth-first pre-order, target first.
    pub fn delete(&mut self, id: &GoalId) -> StoreResult<Vec<GoalId>> {
        let target = self
            .snapshot
            .get(id)
            .ok_or_else(|| StoreError::GoalNotFound(id.clone()))?;
        let parent_id = target.parent_id.clone();

        let mut working = self.working_copy();
        if let Some(parent) = parent_id.and_then(|parent_id| working.get_mut(&parent_id)) {
            parent.child_ids.retain(|child_id| child_id != id);
        }
        let removed = subtree_ids(&working, id);
        for removed_id in &removed {
            working.remove(removed_id);
        }

        self.commit(working)?;
        Ok(removed)
    }

    /// Negates the target's completion and cascades it to all descendants.
    ///
    /// Ancestors are never touched. Returns the new completion value.
    pub fn toggle_completion(&mut self, id: &GoalId) -> StoreResult<bool> {
        let is_done = !self
            .snapshot
            .get(id)
            .ok_or_else(|| StoreError::GoalNotFound(id.clone()))?
            .is_done;

        let mut working = self.working_copy();
        for goal_id in subtree_ids(&working, id) {
            if let Some(goal) = working.get_mut(&goal_id) {
                goal.is_done = is_done;
            }
        }

        self.commit(working)?;
        Ok(is_done)
    }

    /// Flips the display-only expanded flag on one goal.
    pub fn toggle_expanded(&mut self, id: &GoalId) -> StoreResult<bool> {
        let mut working = self.working_copy();
        let goal = working
            .get_mut(id)
            .ok_or_else(|| StoreError::GoalNotFound(id.clone()))?;
        goal.is_expanded = !goal.is_expanded;
        let is_expanded = goal.is_expanded;

        self.commit(working)?;
        Ok(is_expanded)
    }

    /// Swaps sibling `order` values of the dragged and target goals.
    pub fn reorder(&mut self, dragged_id: &GoalId, target_id: &GoalId) -> StoreResult<ReorderOutcome> {
        let dragged = self
            .snapshot
            .get(dragged_id)
            .ok_or_else(|| StoreError::GoalNotFound(dragged_id.clone()))?;
        let target = self
            .snapshot
            .get(target_id)
            .ok_or_else(|| StoreError::GoalNotFound(target_id.clone()))?;

        if dragged_id == target_id {
            return Ok(ReorderOutcome::SameGoal);
        }
        if dragged.parent_id != target.parent_id {
            debug!(
                "event=goal_reorder module=store status=noop reason=not_siblings dragged={} target={}",
                dragged_id, target_id
            );
            return Ok(ReorderOutcome::NotSiblings);
        }

        let (dragged_order, target_order) = (dragged.order, target.order);
        let mut working = self.working_copy();
        if let Some(goal) = working.get_mut(dragged_id) {
            goal.order = target_order;
        }
        if let Some(goal) = working.get_mut(target_id) {
            goal.order = dragged_order;
        }

        self.commit(working)?;
        Ok(ReorderOutcome::Swapped)
    }

    fn working_copy(&self) -> GoalMap {
        GoalMap::clone(&self.snapshot)
    }

    fn commit(&mut self, working: GoalMap) -> StoreResult<()> {
        let violations = integrity::verify(&working);
        if !violations.is_empty() {
            error!(
                "event=store_commit module=store status=error revision={} violations={}",
                self.revision,
                violations.len()
            );
            return Err(StoreError::Integrity(violations));
        }
        self.snapshot = Arc::new(working);
        self.revision += 1;
        Ok(())
    }
}

/// Computes the `order` a new child of `parent_id` receives.
///
/// Siblings are the parent's existing children, or every root goal when
/// `parent_id` is `None`.
///
/// # Errors
/// - `OrderExhausted` when the largest sibling order is `i64::MAX`.
pub fn next_sibling_order(map: &GoalMap, parent_id: Option<&GoalId>) -> StoreResult<i64> {
    let max_order = match parent_id {
        Some(parent_id) => map.get(parent_id).and_then(|parent| {
            parent
                .child_ids
                .iter()
                .filter_map(|child_id| map.get(child_id))
                .map(|child| child.order)
                .max()
        }),
        None => map
            .values()
            .filter(|goal| goal.is_root())
            .map(|goal| goal.order)
            .max(),
    };
    match max_order {
        None => Ok(0),
        Some(order) => order
            .checked_add(1)
            .ok_or_else(|| StoreError::OrderExhausted(parent_id.cloned())),
    }
}
