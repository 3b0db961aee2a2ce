//! Arena walks over `child_ids` / `parent_id` references.
//!
//! All walks are iterative and keep a visited set, so malformed input can
//! neither overflow the stack nor loop forever.

use crate::model::goal::{GoalId, GoalMap};
use std::collections::HashSet;

/// Returns `root` and every transitive descendant in depth-first pre-order.
///
/// Ids listed in `child_ids` but missing from the map are skipped.
/// Returns an empty list when `root` itself is missing.
pub fn subtree_ids(map: &GoalMap, root: &GoalId) -> Vec<GoalId> {
    let mut visited = HashSet::new();
    let mut ordered = Vec::new();
    let mut stack = vec![root];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let Some(goal) = map.get(current) else {
            continue;
        };
        ordered.push(current.clone());
        stack.extend(goal.child_ids.iter().rev());
    }

    ordered
}

/// Follows `parent_id` from `id` to the top-most reachable goal.
///
/// Stops at a root, at a missing parent, or when the chain loops.
pub fn root_of<'a>(map: &'a GoalMap, id: &'a GoalId) -> &'a GoalId {
    let mut visited = HashSet::new();
    let mut current = id;
    while visited.insert(current) {
        match map.get(current).and_then(|goal| goal.parent_id.as_ref()) {
            Some(parent_id) if map.contains_key(parent_id) => current = parent_id,
            _ => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::{root_of, subtree_ids};
    use crate::model::goal::{Goal, GoalDraft, GoalId, GoalMap};

    fn goal(id: &str, parent: Option<&str>, children: &[&str]) -> Goal {
        let mut goal = Goal::from_draft(
            GoalId::from(id),
            parent.map(GoalId::from),
            GoalDraft::new(id),
            0,
        );
        goal.child_ids = children.iter().map(|child| GoalId::from(*child)).collect();
        goal
    }

    fn sample() -> GoalMap {
        [
            goal("a", None, &["b", "c"]),
            goal("b", Some("a"), &["d"]),
            goal("c", Some("a"), &["ghost"]),
            goal("d", Some("b"), &[]),
        ]
        .into_iter()
        .map(|goal| (goal.id.clone(), goal))
        .collect()
    }

    #[test]
    fn subtree_is_preorder_and_skips_missing_children() {
        let map = sample();
        let ids = subtree_ids(&map, &GoalId::from("a"));
        let names: Vec<&str> = ids.iter().map(GoalId::as_str).collect();
        assert_eq!(names, vec!["a", "b", "d", "c"]);
        assert!(subtree_ids(&map, &GoalId::from("missing")).is_empty());
    }

    #[test]
    fn root_of_walks_to_top() {
        let map = sample();
        assert_eq!(root_of(&map, &GoalId::from("d")).as_str(), "a");
        assert_eq!(root_of(&map, &GoalId::from("a")).as_str(), "a");
    }

    #[test]
    fn walks_terminate_on_cycles() {
        let map: GoalMap = [goal("x", Some("y"), &["y"]), goal("y", Some("x"), &["x"])]
            .into_iter()
            .map(|goal| (goal.id.clone(), goal))
            .collect();
        assert_eq!(subtree_ids(&map, &GoalId::from("x")).len(), 2);
        let x = GoalId::from("x");
        let top = root_of(&map, &x);
        assert!(top.as_str() == "x" || top.as_str() == "y");
    }
}
