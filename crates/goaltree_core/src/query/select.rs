//! Selections derived from the goal map: roots, leaves, children, tags.
//!
//! Results borrow from the map and follow its iteration order unless a
//! function says otherwise.

use crate::model::goal::{Goal, GoalId, GoalMap};
use crate::query::sort::{sort_by_deadline, sort_goals, SortKey};
use crate::store::traversal::root_of;
use std::collections::{BTreeSet, HashMap};

/// All goals without a parent.
pub fn root_goals(map: &GoalMap) -> Vec<&Goal> {
    map.values().filter(|goal| goal.is_root()).collect()
}

/// All open goals without children: the actionable items.
pub fn leaf_goals(map: &GoalMap) -> Vec<&Goal> {
    map.values()
        .filter(|goal| goal.is_leaf() && !goal.is_done)
        .collect()
}

/// Direct children of `id` in `child_ids` order, skipping dangling ids.
pub fn child_goals<'a>(map: &'a GoalMap, id: &GoalId) -> Vec<&'a Goal> {
    map.get(id)
        .map(|goal| {
            goal.child_ids
                .iter()
                .filter_map(|child_id| map.get(child_id))
                .collect()
        })
        .unwrap_or_default()
}

/// Direct children of `id` sorted by `key`.
pub fn sorted_children<'a>(map: &'a GoalMap, id: &GoalId, key: SortKey) -> Vec<&'a Goal> {
    sort_goals(&child_goals(map, id), map, key)
}

/// Open leaves bucketed under the root goal they descend from.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafGroup<'a> {
    pub root: &'a Goal,
    /// Ascending deadline, undated last, otherwise map order.
    pub leaves: Vec<&'a Goal>,
}

/// Groups [`leaf_goals`] by their root.
///
/// Groups appear in the order their first leaf is met. A root goal that is
/// itself an open leaf forms its own group.
pub fn group_leaves_by_root(map: &GoalMap) -> Vec<LeafGroup<'_>> {
    let mut groups: Vec<LeafGroup<'_>> = Vec::new();
    let mut index_by_root: HashMap<&GoalId, usize> = HashMap::new();

    for leaf in leaf_goals(map) {
        let root_id = root_of(map, &leaf.id);
        let Some(root) = map.get(root_id) else {
            continue;
        };
        let index = *index_by_root.entry(root_id).or_insert_with(|| {
            groups.push(LeafGroup {
                root,
                leaves: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].leaves.push(leaf);
    }

    for group in &mut groups {
        sort_by_deadline(&mut group.leaves);
    }
    groups
}

/// Every distinct tag across all goals, lexicographically sorted.
pub fn all_tags(map: &GoalMap) -> Vec<String> {
    map.values()
        .flat_map(|goal| goal.tags.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{all_tags, child_goals, root_goals};
    use crate::model::goal::{Goal, GoalDraft, GoalId, GoalMap};

    #[test]
    fn tags_are_deduplicated_and_sorted() {
        let mut map = GoalMap::new();
        for (id, tags) in [("a", vec!["work", "health"]), ("b", vec!["health", "art"])] {
            let goal = Goal::from_draft(
                GoalId::from(id),
                None,
                GoalDraft::new(id).with_tags(tags),
                0,
            );
            map.insert(goal.id.clone(), goal);
        }
        assert_eq!(all_tags(&map), vec!["art", "health", "work"]);
        assert_eq!(root_goals(&map).len(), 2);
        assert!(child_goals(&map, &GoalId::from("missing")).is_empty());
    }
}
