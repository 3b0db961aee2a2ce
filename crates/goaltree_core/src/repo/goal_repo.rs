//! Goal map persistence adapter.
//!
//! # Responsibility
//! - Read and write the whole `GoalMap` as one value under a namespace key.
//! - Preserve unreadable values instead of silently overwriting them.
//!
//! # Invariants
//! - An absent key loads as an empty map with a clean report.
//! - `save` always writes the complete map; there are no partial writes.

use crate::model::goal::GoalMap;
use crate::repo::goal_codec::{decode_goal_map, encode_goal_map, CodecError, LoadReport};
use crate::repo::kv_store::{KeyValueStore, KvError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Namespace key the goal map is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "HierarchicalGoalApp";

const CORRUPT_SUFFIX: &str = ".corrupt";

pub type GoalRepoResult<T> = Result<T, GoalRepoError>;

/// Errors from goal persistence.
#[derive(Debug)]
pub enum GoalRepoError {
    /// Durable store failure.
    Kv(KvError),
    /// Stored value could not be decoded or the map could not be encoded.
    Codec(CodecError),
}

impl Display for GoalRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GoalRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<KvError> for GoalRepoError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

impl From<CodecError> for GoalRepoError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// A decoded goal map together with what decoding had to fix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedGoals {
    pub goals: GoalMap,
    pub report: LoadReport,
}

/// Repository storing one goal map under one key.
pub struct GoalMapRepository<S: KeyValueStore> {
    kv: S,
    key: String,
}

impl<S: KeyValueStore> GoalMapRepository<S> {
    /// Creates a repository bound to [`DEFAULT_STORAGE_KEY`].
    pub fn new(kv: S) -> Self {
        Self::with_key(kv, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(kv: S, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key a corrupt value is copied to by [`GoalMapRepository::quarantine`].
    pub fn quarantine_key(&self) -> String {
        format!("{}{CORRUPT_SUFFIX}", self.key)
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Loads and decodes the stored map.
    ///
    /// # Errors
    /// - `Codec` when the stored value as a whole is unusable.
    /// - `Kv` on durable store failure.
    pub fn load(&self) -> GoalRepoResult<LoadedGoals> {
        let started_at = Instant::now();
        let Some(raw) = self.kv.get_item(&self.key)? else {
            info!("event=goals_load module=repo status=ok source=empty count=0");
            return Ok(LoadedGoals::default());
        };

        let (goals, report) = decode_goal_map(&raw)?;
        if report.is_clean() {
            info!(
                "event=goals_load module=repo status=ok count={} duration_ms={}",
                report.loaded,
                started_at.elapsed().as_millis()
            );
        } else {
            warn!(
                "event=goals_load module=repo status=degraded count={} dropped={} defaulted={} repaired={} duration_ms={}",
                report.loaded,
                report.dropped(),
                report.defaulted(),
                report.repaired(),
                started_at.elapsed().as_millis()
            );
        }
        Ok(LoadedGoals { goals, report })
    }

    /// Encodes and writes the full map.
    pub fn save(&self, goals: &GoalMap) -> GoalRepoResult<()> {
        let encoded = encode_goal_map(goals)?;
        self.kv.set_item(&self.key, &encoded)?;
        Ok(())
    }

    /// Copies the raw stored value to [`GoalMapRepository::quarantine_key`].
    ///
    /// Returns the backup key, or `None` when nothing is stored.
    pub fn quarantine(&self) -> GoalRepoResult<Option<String>> {
        let Some(raw) = self.kv.get_item(&self.key)? else {
            return Ok(None);
        };
        let backup_key = self.quarantine_key();
        self.kv.set_item(&backup_key, &raw)?;
        warn!(
            "event=goals_quarantine module=repo status=ok bytes={}",
            raw.len()
        );
        Ok(Some(backup_key))
    }

    /// Removes the stored map.
    pub fn clear(&self) -> GoalRepoResult<()> {
        self.kv.remove_item(&self.key)?;
        Ok(())
    }
}
