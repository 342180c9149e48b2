use super::record::StatusRecord;
use crate::probe::ProbeResult;
use crate::registry::Entity;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// History points kept per entity (5 minutes at 5 s intervals)
pub const DEFAULT_HISTORY_LEN: usize = 60;

/// `last_round_completed_at` before any round has finished
const NEVER_MS: i64 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("status store already initialized")]
    AlreadyInitialized,
}

/// In-memory status of every registered entity.
///
/// Each record lives in its own DashMap slot: a commit replaces the whole
/// record under that slot's write lock, so readers see either the previous
/// record or the new one. Commits for different entities do not contend.
pub struct StatusStore {
    /// Entity ids in registry order; fixed by `initialize`
    order: OnceLock<Vec<String>>,

    records: DashMap<String, StatusRecord>,

    /// Start time (epoch ms) of the last completed round
    last_round_completed_ms: AtomicI64,

    history_len: usize,
}

impl StatusStore {
    pub fn new(history_len: usize) -> Self {
        Self {
            order: OnceLock::new(),
            records: DashMap::new(),
            last_round_completed_ms: AtomicI64::new(NEVER_MS),
            history_len: history_len.max(1),
        }
    }

    /// Create a "not yet probed" record for every entity.
    ///
    /// Only the first call has any effect; later calls return
    /// `AlreadyInitialized` and leave existing records untouched.
    pub fn initialize(&self, entities: &[Entity]) -> Result<(), StoreError> {
        let ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
        self.order
            .set(ids)
            .map_err(|_| StoreError::AlreadyInitialized)?;

        let now = Utc::now();
        for entity in entities {
            self.records
                .entry(entity.id.clone())
                .or_insert_with(|| StatusRecord::not_yet_probed(entity.clone(), now));
        }

        info!(entities = entities.len(), "Status store initialized");
        Ok(())
    }

    /// Fold a probe result into the entity's record and return the new record
    pub fn commit(&self, result: ProbeResult) -> Result<StatusRecord, StoreError> {
        let Some(mut slot) = self.records.get_mut(&result.entity_id) else {
            warn!(entity_id = %result.entity_id, "Dropping probe result for unknown entity");
            return Err(StoreError::UnknownEntity(result.entity_id));
        };

        let next = slot.next(&result, self.history_len);
        *slot = next.clone();
        drop(slot);

        debug!(
            entity_id = %next.entity_id,
            online = next.online,
            player_count = ?next.current_player_count,
            record = ?next.record_player_count,
            "Status committed"
        );

        Ok(next)
    }

    pub fn get(&self, entity_id: &str) -> Option<StatusRecord> {
        self.records.get(entity_id).map(|r| r.clone())
    }

    /// All records in registry order, regardless of commit order
    pub fn get_all(&self) -> Vec<StatusRecord> {
        let Some(order) = self.order.get() else {
            return Vec::new();
        };

        order
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.clone()))
            .collect()
    }

    /// Start time of the last completed round, or the Unix epoch if none
    pub fn last_round_completed_at(&self) -> DateTime<Utc> {
        let ms = self.last_round_completed_ms.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
    }

    pub fn set_last_round_completed_at(&self, at: DateTime<Utc>) {
        self.last_round_completed_ms
            .store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// Forget the last round so the next freshness check fails
    pub fn reset_last_round(&self) {
        self.last_round_completed_ms.store(NEVER_MS, Ordering::SeqCst);
    }

    pub fn has_completed_round(&self) -> bool {
        self.last_round_completed_ms.load(Ordering::SeqCst) != NEVER_MS
    }

    /// True when a round has completed and is at most `max_age` old at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let last = self.last_round_completed_ms.load(Ordering::SeqCst);
        if last == NEVER_MS {
            return false;
        }
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        now.timestamp_millis().saturating_sub(last) <= max_age_ms
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}
