//! Goal session service.
//!
//! # Responsibility
//! - Own one `GoalStore` and its persistence adapter for a session.
//! - Normalize editor input, delegate mutations to the store, and write the
//!   new snapshot through after every committed change.
//! - Offer the read-side queries presentation code renders from.
//!
//! # Invariants
//! - A mutation that fails leaves both the store and the persisted value
//!   untouched.
//! - Persist failures are logged and never fail the in-memory mutation.
//! - No-op mutations (same revision) do not write.

use crate::model::goal::{normalize_tags, Goal, GoalDraft, GoalId, GoalMap, GoalPatch};
use crate::query::filter::{filter_goals, FilterCriteria};
use crate::query::progress::compute_progress;
use crate::query::select::{all_tags, group_leaves_by_root, root_goals, sorted_children, LeafGroup};
use crate::query::sort::{sort_goals, SortKey};
use crate::query::stats::{calculate_statistics, GoalStatistics};
use crate::repo::goal_codec::LoadReport;
use crate::repo::goal_repo::{GoalMapRepository, GoalRepoError};
use crate::repo::kv_store::KeyValueStore;
use crate::store::goal_store::{GoalStore, ReorderOutcome, StoreError, StoreResult};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from goal session operations.
#[derive(Debug)]
pub enum GoalServiceError {
    /// Store rejected the mutation.
    Store(StoreError),
    /// Persistence failed while opening the session.
    Repo(GoalRepoError),
}

impl Display for GoalServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GoalServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<StoreError> for GoalServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<GoalRepoError> for GoalServiceError {
    fn from(value: GoalRepoError) -> Self {
        Self::Repo(value)
    }
}

/// Goal session facade over a persistence repository.
pub struct GoalService<S: KeyValueStore> {
    repo: GoalMapRepository<S>,
    store: GoalStore,
    load_report: LoadReport,
    quarantined_key: Option<String>,
}

impl<S: KeyValueStore> GoalService<S> {
    /// Opens a session by loading the persisted goal map.
    ///
    /// An undecodable stored value is copied to the repository's quarantine
    /// key and the session starts empty.
    ///
    /// # Errors
    /// - `Repo` when the durable store itself fails.
    pub fn open(repo: GoalMapRepository<S>) -> Result<Self, GoalServiceError> {
        let (store, load_report, quarantined_key) = match repo.load() {
            Ok(loaded) => {
                let (store, _) = GoalStore::from_map_repaired(loaded.goals);
                (store, loaded.report, None)
            }
            Err(GoalRepoError::Codec(err)) => {
                error!(
                    "event=session_open module=service status=error error_code=undecodable_goals error={}",
                    err
                );
                let backup_key = repo.quarantine()?;
                (GoalStore::new(), LoadReport::default(), backup_key)
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            "event=session_open module=service status=ok count={} issues={}",
            store.len(),
            load_report.issues.len()
        );
        Ok(Self {
            repo,
            store,
            load_report,
            quarantined_key,
        })
    }

    pub fn store(&self) -> &GoalStore {
        &self.store
    }

    pub fn goals(&self) -> &GoalMap {
        self.store.goals()
    }

    pub fn get(&self, id: &GoalId) -> Option<&Goal> {
        self.store.get(id)
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Backup key holding an undecodable value found at open, if any.
    pub fn quarantined_key(&self) -> Option<&str> {
        self.quarantined_key.as_deref()
    }

    pub fn repository(&self) -> &GoalMapRepository<S> {
        &self.repo
    }

    /// Creates a goal, normalizing its tags first.
    pub fn create_goal(
        &mut self,
        parent_id: Option<&GoalId>,
        draft: GoalDraft,
    ) -> Result<Goal, GoalServiceError> {
        let draft = GoalDraft {
            tags: normalize_tags(&draft.tags),
            ..draft
        };
        let before = self.store.revision();
        let result = self.store.create(parent_id, draft);
        self.finish("goal_create", before, result)
    }

    /// Applies a partial update, normalizing replacement tags first.
    pub fn update_goal(&mut self, id: &GoalId, patch: GoalPatch) -> Result<Goal, GoalServiceError> {
        let patch = GoalPatch {
            tags: patch.tags.map(normalize_tags),
            ..patch
        };
        let before = self.store.revision();
        let result = self.store.update(id, patch);
        self.finish("goal_update", before, result)
    }

    /// Deletes a goal with its subtree. Returns every removed id.
    pub fn delete_goal(&mut self, id: &GoalId) -> Result<Vec<GoalId>, GoalServiceError> {
        let before = self.store.revision();
        let result = self.store.delete(id);
        self.finish("goal_delete", before, result)
    }

    /// Toggles completion with cascade. Returns the new value.
    pub fn toggle_completion(&mut self, id: &GoalId) -> Result<bool, GoalServiceError> {
        let before = self.store.revision();
        let result = self.store.toggle_completion(id);
        self.finish("goal_toggle_completion", before, result)
    }

    /// Toggles the display-only expanded flag. Returns the new value.
    pub fn toggle_expanded(&mut self, id: &GoalId) -> Result<bool, GoalServiceError> {
        let before = self.store.revision();
        let result = self.store.toggle_expanded(id);
        self.finish("goal_toggle_expanded", before, result)
    }

    /// Swaps sibling order between the dragged and target goals.
    pub fn reorder(
        &mut self,
        dragged_id: &GoalId,
        target_id: &GoalId,
    ) -> Result<ReorderOutcome, GoalServiceError> {
        let before = self.store.revision();
        let result = self.store.reorder(dragged_id, target_id);
        self.finish("goal_reorder", before, result)
    }

    /// Root goals sorted by `key`.
    pub fn root_goals(&self, key: SortKey) -> Vec<&Goal> {
        sort_goals(&root_goals(self.goals()), self.goals(), key)
    }

    /// Root goals passing `criteria`, sorted by `key`.
    pub fn filter_roots(&self, criteria: &FilterCriteria, key: SortKey) -> Vec<&Goal> {
        let roots = root_goals(self.goals());
        sort_goals(&filter_goals(&roots, criteria), self.goals(), key)
    }

    /// Direct children of `id` sorted by `key`.
    pub fn children(&self, id: &GoalId, key: SortKey) -> Vec<&Goal> {
        sorted_children(self.goals(), id, key)
    }

    /// Open leaves grouped under their root goals.
    pub fn leaf_groups(&self) -> Vec<LeafGroup<'_>> {
        group_leaves_by_root(self.goals())
    }

    pub fn all_tags(&self) -> Vec<String> {
        all_tags(self.goals())
    }

    pub fn statistics(&self) -> GoalStatistics {
        calculate_statistics(self.goals())
    }

    pub fn progress(&self, id: &GoalId) -> f64 {
        compute_progress(self.goals(), id)
    }

    fn finish<T>(
        &self,
        event: &'static str,
        before: u64,
        result: StoreResult<T>,
    ) -> Result<T, GoalServiceError> {
        match result {
            Ok(value) => {
                if self.store.revision() == before {
                    debug!("event={} module=service status=noop revision={}", event, before);
                } else {
                    self.persist(event);
                }
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event={} module=service status=error revision={} error={}",
                    event,
                    self.store.revision(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn persist(&self, event: &'static str) {
        let revision = self.store.revision();
        match self.repo.save(self.store.goals()) {
            Ok(()) => info!(
                "event={} module=service status=ok revision={} count={}",
                event,
                revision,
                self.store.len()
            ),
            Err(err) => error!(
                "event={} module=service status=error error_code=persist_failed revision={} error={}",
                event, revision, err
            ),
        }
    }
}
