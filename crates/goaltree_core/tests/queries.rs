use chrono::{DateTime, TimeZone, Utc};
use goaltree_core::{
    calculate_statistics_at, filter_goal_trees, filter_goals_at, group_leaves_by_root,
    leaf_goals, root_goals, sort_goals, FilterCriteria, GoalDraft, GoalId, GoalPatch,
    GoalStore, SortKey,
};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn names<'a>(goals: impl IntoIterator<Item = &'a goaltree_core::Goal>) -> Vec<&'a str> {
    goals.into_iter().map(|goal| goal.name.as_str()).collect()
}

fn done(store: &mut GoalStore, id: &GoalId) {
    store
        .update(id, GoalPatch {
            is_done: Some(true),
            ..GoalPatch::default()
        })
        .unwrap();
}

#[test]
fn deadline_sort_puts_undated_goals_last() {
    let mut store = GoalStore::new();
    store.create(None, GoalDraft::new("Undated")).unwrap();
    store
        .create(None, GoalDraft::new("March").with_deadline(at(2026, 3, 1)))
        .unwrap();
    store
        .create(None, GoalDraft::new("January").with_deadline(at(2026, 1, 1)))
        .unwrap();

    let roots = root_goals(store.goals());
    let sorted = sort_goals(&roots, store.goals(), SortKey::Deadline);
    assert_eq!(names(sorted), vec!["January", "March", "Undated"]);
}

#[test]
fn importance_sort_is_descending_and_order_sort_ascending() {
    let mut store = GoalStore::new();
    store
        .create(None, GoalDraft::new("Low").with_importance(1))
        .unwrap();
    store
        .create(None, GoalDraft::new("High").with_importance(5))
        .unwrap();
    store
        .create(None, GoalDraft::new("Mid").with_importance(3))
        .unwrap();
    let roots = root_goals(store.goals());

    assert_eq!(
        names(sort_goals(&roots, store.goals(), SortKey::Importance)),
        vec!["High", "Mid", "Low"]
    );
    assert_eq!(
        names(sort_goals(&roots, store.goals(), SortKey::Order)),
        vec!["Low", "High", "Mid"]
    );
}

#[test]
fn progress_sort_is_ascending_and_keeps_ties_in_input_order() {
    let mut store = GoalStore::new();
    let half = store.create(None, GoalDraft::new("Half")).unwrap().id;
    let half_done = store
        .create(Some(&half), GoalDraft::new("Half step 1"))
        .unwrap()
        .id;
    store
        .create(Some(&half), GoalDraft::new("Half step 2"))
        .unwrap();
    done(&mut store, &half_done);
    let finished = store.create(None, GoalDraft::new("Finished")).unwrap().id;
    done(&mut store, &finished);
    let open_a = store.create(None, GoalDraft::new("Open A")).unwrap().id;
    let open_b = store.create(None, GoalDraft::new("Open B")).unwrap().id;

    let listed: Vec<&goaltree_core::Goal> = [&half, &finished, &open_b, &open_a]
        .into_iter()
        .map(|id| store.get(id).unwrap())
        .collect();
    let sorted = sort_goals(&listed, store.goals(), SortKey::Progress);
    assert_eq!(names(sorted), vec!["Open B", "Open A", "Half", "Finished"]);
}

#[test]
fn filter_combines_completion_and_importance() {
    let mut store = GoalStore::new();
    let a = store
        .create(None, GoalDraft::new("A").with_importance(5))
        .unwrap()
        .id;
    store
        .create(None, GoalDraft::new("B").with_importance(5))
        .unwrap();
    let c = store
        .create(None, GoalDraft::new("C").with_importance(3))
        .unwrap()
        .id;
    done(&mut store, &a);
    done(&mut store, &c);

    let criteria = FilterCriteria {
        is_done: Some(true),
        importance: Some(5),
        ..FilterCriteria::default()
    };
    let roots = root_goals(store.goals());
    let matched = filter_goals_at(&roots, &criteria, at(2026, 1, 1));
    assert_eq!(names(matched), vec!["A"]);
}

#[test]
fn search_tags_and_overdue_narrow_results() {
    let mut store = GoalStore::new();
    store
        .create(
            None,
            GoalDraft::new("Run a marathon")
                .with_tags(["health"])
                .with_deadline(at(2026, 1, 1)),
        )
        .unwrap();
    store
        .create(
            None,
            GoalDraft::new("Read more")
                .with_tags(["learning"])
                .with_deadline(at(2026, 6, 1)),
        )
        .unwrap();
    let roots = root_goals(store.goals());
    let now = at(2026, 3, 1);

    let search = FilterCriteria {
        search_text: "MARATHON".to_string(),
        ..FilterCriteria::default()
    };
    assert_eq!(names(filter_goals_at(&roots, &search, now)), vec!["Run a marathon"]);

    let tagged = FilterCriteria {
        tags: vec!["learning".to_string(), "art".to_string()],
        ..FilterCriteria::default()
    };
    assert_eq!(names(filter_goals_at(&roots, &tagged, now)), vec!["Read more"]);

    let overdue = FilterCriteria {
        overdue_only: true,
        ..FilterCriteria::default()
    };
    assert_eq!(names(filter_goals_at(&roots, &overdue, now)), vec!["Run a marathon"]);
}

#[test]
fn tree_filter_keeps_roots_with_matching_descendants() {
    let mut store = GoalStore::new();
    let trip = store.create(None, GoalDraft::new("Plan trip")).unwrap().id;
    store
        .create(Some(&trip), GoalDraft::new("Book flights"))
        .unwrap();
    store.create(None, GoalDraft::new("Garden")).unwrap();

    let criteria = FilterCriteria {
        search_text: "flights".to_string(),
        ..FilterCriteria::default()
    };
    let roots = root_goals(store.goals());
    let now = at(2026, 1, 1);

    assert!(filter_goals_at(&roots, &criteria, now).is_empty());
    assert_eq!(
        names(filter_goal_trees(&roots, store.goals(), &criteria, now)),
        vec!["Plan trip"]
    );
}

#[test]
fn statistics_count_every_goal() {
    let mut store = GoalStore::new();
    let first = store
        .create(
            None,
            GoalDraft::new("First")
                .with_importance(5)
                .with_tags(["work"]),
        )
        .unwrap()
        .id;
    let second = store
        .create(
            Some(&first),
            GoalDraft::new("Second")
                .with_importance(5)
                .with_tags(["work", "urgent"]),
        )
        .unwrap()
        .id;
    store
        .create(
            None,
            GoalDraft::new("Third")
                .with_importance(3)
                .with_deadline(at(2026, 1, 1)),
        )
        .unwrap();
    done(&mut store, &first);
    done(&mut store, &second);

    let stats = calculate_statistics_at(store.goals(), at(2026, 2, 1));
    assert_eq!(stats.total_goals, 3);
    assert_eq!(stats.completed_goals, 2);
    assert_eq!(stats.overdue_goals, 1);
    assert_eq!(stats.completion_rate, 66.67);
    assert_eq!(stats.by_importance.get(&5), Some(&2));
    assert_eq!(stats.by_importance.get(&3), Some(&1));
    assert_eq!(stats.by_importance.get(&1), Some(&0));
    assert_eq!(stats.by_tag.get("work"), Some(&2));
    assert_eq!(stats.by_tag.get("urgent"), Some(&1));
    assert_eq!(stats.completed_this_week, 0);

    let empty = calculate_statistics_at(&Default::default(), at(2026, 2, 1));
    assert_eq!(empty.completion_rate, 0.0);
    assert_eq!(empty.by_importance.len(), 5);
}

#[test]
fn open_leaves_are_grouped_under_their_roots() {
    let mut store = GoalStore::new();
    let work = store.create(None, GoalDraft::new("Work")).unwrap().id;
    let project = store
        .create(Some(&work), GoalDraft::new("Project"))
        .unwrap()
        .id;
    store
        .create(Some(&project), GoalDraft::new("Later task"))
        .unwrap();
    store
        .create(
            Some(&project),
            GoalDraft::new("Soon task").with_deadline(at(2026, 1, 5)),
        )
        .unwrap();
    let finished = store
        .create(Some(&work), GoalDraft::new("Finished"))
        .unwrap()
        .id;
    done(&mut store, &finished);
    store.create(None, GoalDraft::new("Solo")).unwrap();

    assert_eq!(leaf_goals(store.goals()).len(), 3);

    let groups = group_leaves_by_root(store.goals());
    let mut summary: Vec<(&str, Vec<&str>)> = groups
        .iter()
        .map(|group| (group.root.name.as_str(), names(group.leaves.iter().copied())))
        .collect();
    summary.sort();
    assert_eq!(
        summary,
        vec![
            ("Solo", vec!["Solo"]),
            ("Work", vec!["Soon task", "Later task"]),
        ]
    );
}
