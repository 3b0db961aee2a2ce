//! Core domain logic for the hierarchical goal tracker.
//! This crate is the single source of truth for forest invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod store;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::goal::{
    normalize_tag, normalize_tags, Goal, GoalDraft, GoalId, GoalMap, GoalPatch,
    GoalValidationError, DEFAULT_IMPORTANCE, MAX_IMPORTANCE, MIN_IMPORTANCE,
};
pub use query::filter::{filter_goal_trees, filter_goals, filter_goals_at, FilterCriteria};
pub use query::progress::compute_progress;
pub use query::select::{
    all_tags, child_goals, group_leaves_by_root, leaf_goals, root_goals, sorted_children,
    LeafGroup,
};
pub use query::sort::{sort_by_deadline, sort_goals, ParseSortKeyError, SortKey};
pub use query::stats::{calculate_statistics, calculate_statistics_at, GoalStatistics};
pub use repo::goal_codec::{decode_goal_map, encode_goal_map, CodecError, LoadIssue, LoadReport};
pub use repo::goal_repo::{
    GoalMapRepository, GoalRepoError, GoalRepoResult, LoadedGoals, DEFAULT_STORAGE_KEY,
};
pub use repo::kv_store::{
    KeyValueStore, KvError, KvResult, MemoryKeyValueStore, SqliteKeyValueStore,
};
pub use service::goal_service::{GoalService, GoalServiceError};
pub use store::goal_store::{GoalStore, ReorderOutcome, StoreError, StoreResult};
pub use store::integrity::IntegrityViolation;

/// Minimal health-check API for host wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
