use goaltree_core::{
    FilterCriteria, GoalDraft, GoalId, GoalMapRepository, GoalPatch, GoalService,
    GoalServiceError, KeyValueStore, MemoryKeyValueStore, ReorderOutcome, SortKey, StoreError,
    DEFAULT_STORAGE_KEY,
};

fn open(kv: &MemoryKeyValueStore) -> GoalService<&MemoryKeyValueStore> {
    GoalService::open(GoalMapRepository::new(kv)).unwrap()
}

#[test]
fn mutations_write_through_and_survive_reopen() {
    let kv = MemoryKeyValueStore::new();
    let (root, child) = {
        let mut service = open(&kv);
        let root = service.create_goal(None, GoalDraft::new("Home")).unwrap().id;
        let child = service
            .create_goal(Some(&root), GoalDraft::new("Paint fence"))
            .unwrap()
            .id;
        service.toggle_completion(&child).unwrap();
        (root, child)
    };

    let service = open(&kv);
    assert!(service.load_report().is_clean());
    assert_eq!(service.goals().len(), 2);
    assert!(service.get(&child).unwrap().is_done);
    assert_eq!(service.progress(&root), 100.0);
}

#[test]
fn failed_and_noop_mutations_do_not_write() {
    let kv = MemoryKeyValueStore::new();
    let mut service = open(&kv);
    let first = service.create_goal(None, GoalDraft::new("First")).unwrap().id;
    let second = service.create_goal(None, GoalDraft::new("Second")).unwrap().id;
    let persisted = kv.get_item(DEFAULT_STORAGE_KEY).unwrap();

    let err = service
        .update_goal(&GoalId::from("missing"), GoalPatch::default())
        .unwrap_err();
    assert!(matches!(err, GoalServiceError::Store(StoreError::GoalNotFound(_))));

    let child = service
        .create_goal(Some(&first), GoalDraft::new("Nested"))
        .unwrap()
        .id;
    let persisted_with_child = kv.get_item(DEFAULT_STORAGE_KEY).unwrap();
    assert_ne!(persisted, persisted_with_child);

    assert_eq!(
        service.reorder(&child, &second).unwrap(),
        ReorderOutcome::NotSiblings
    );
    assert_eq!(kv.get_item(DEFAULT_STORAGE_KEY).unwrap(), persisted_with_child);
}

#[test]
fn corrupt_stored_value_is_quarantined_and_session_starts_empty() {
    let kv = MemoryKeyValueStore::new();
    kv.set_item(DEFAULT_STORAGE_KEY, "[not json").unwrap();

    let mut service = open(&kv);
    assert!(service.goals().is_empty());
    assert_eq!(service.quarantined_key(), Some("HierarchicalGoalApp.corrupt"));
    assert_eq!(
        kv.get_item("HierarchicalGoalApp.corrupt").unwrap().as_deref(),
        Some("[not json")
    );

    service.create_goal(None, GoalDraft::new("Fresh start")).unwrap();
    assert_eq!(
        kv.get_item("HierarchicalGoalApp.corrupt").unwrap().as_deref(),
        Some("[not json")
    );
}

#[test]
fn tags_are_normalized_on_create_and_update() {
    let kv = MemoryKeyValueStore::new();
    let mut service = open(&kv);
    let goal = service
        .create_goal(
            None,
            GoalDraft::new("Run").with_tags(["#health", " health ", "", "long   run"]),
        )
        .unwrap();
    assert_eq!(goal.tags, vec!["health".to_string(), "long run".to_string()]);

    let updated = service
        .update_goal(&goal.id, GoalPatch {
            tags: Some(vec!["#Work".to_string(), "Work".to_string()]),
            ..GoalPatch::default()
        })
        .unwrap();
    assert_eq!(updated.tags, vec!["Work".to_string()]);
    assert_eq!(service.all_tags(), vec!["Work".to_string()]);
}

#[test]
fn session_queries_reflect_current_state() {
    let kv = MemoryKeyValueStore::new();
    let mut service = open(&kv);
    let big = service
        .create_goal(None, GoalDraft::new("Big").with_importance(5))
        .unwrap()
        .id;
    service
        .create_goal(None, GoalDraft::new("Small").with_importance(1))
        .unwrap();
    service
        .create_goal(Some(&big), GoalDraft::new("Step"))
        .unwrap();

    let roots: Vec<&str> = service
        .root_goals(SortKey::Importance)
        .into_iter()
        .map(|goal| goal.name.as_str())
        .collect();
    assert_eq!(roots, vec!["Big", "Small"]);

    let criteria = FilterCriteria {
        importance: Some(1),
        ..FilterCriteria::default()
    };
    assert_eq!(service.filter_roots(&criteria, SortKey::None).len(), 1);
    assert_eq!(service.children(&big, SortKey::Order).len(), 1);
    assert_eq!(service.leaf_groups().len(), 2);
    assert_eq!(service.statistics().total_goals, 3);

    assert!(!service.toggle_expanded(&big).unwrap());
    let removed = service.delete_goal(&big).unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(service.statistics().total_goals, 1);
}

#[test]
fn stored_extreme_order_does_not_break_creating_a_sibling() {
    let kv = MemoryKeyValueStore::new();
    kv.set_item(
        DEFAULT_STORAGE_KEY,
        r#"{"last": {"id": "last", "name": "Last", "parentId": null, "childIds": [],
                     "isDone": false, "importance": 3, "isExpanded": true,
                     "order": 9223372036854775807}}"#,
    )
    .unwrap();

    let mut service = open(&kv);
    assert_eq!(service.load_report().defaulted(), 1);
    let stored_order = service.get(&GoalId::from("last")).unwrap().order;

    let created = service.create_goal(None, GoalDraft::new("After")).unwrap();
    assert_eq!(created.order, stored_order + 1);
    let roots: Vec<&str> = service
        .root_goals(SortKey::Order)
        .into_iter()
        .map(|goal| goal.name.as_str())
        .collect();
    assert_eq!(roots, vec!["Last", "After"]);
}
