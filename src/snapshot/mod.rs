use crate::status::{StatusRecord, StatusStore};
use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Statuses of every entity at read time
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// One record per entity, in registry order
    pub statuses: Vec<StatusRecord>,

    /// Start time of the last completed round (Unix epoch if none has completed)
    #[serde(with = "ts_milliseconds")]
    pub last_update: DateTime<Utc>,
}

/// Read-only view of the status store.
///
/// Never triggers probing; callers that need fresh data go through the
/// refresh coordinator first.
#[derive(Clone)]
pub struct SnapshotReader {
    store: Arc<StatusStore>,
}

impl SnapshotReader {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }

    pub fn get_snapshot(&self) -> Snapshot {
        Snapshot {
            statuses: self.store.get_all(),
            last_update: self.store.last_round_completed_at(),
        }
    }

    pub fn get_status(&self, entity_id: &str) -> Option<StatusRecord> {
        self.store.get(entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeResult;
    use crate::registry::{Entity, EntityKind, ServerAddress};

    fn reader_with(ids: &[&str]) -> (SnapshotReader, Arc<StatusStore>) {
        let entities: Vec<Entity> = ids
            .iter()
            .map(|id| Entity {
                id: id.to_string(),
                name: id.to_string(),
                address: ServerAddress {
                    host: "localhost".to_string(),
                    port: None,
                },
                kind: EntityKind::Java,
                color: None,
            })
            .collect();
        let store = Arc::new(StatusStore::default());
        store.initialize(&entities).unwrap();
        (SnapshotReader::new(Arc::clone(&store)), store)
    }

    #[test]
    fn test_snapshot_before_any_round() {
        let (reader, _store) = reader_with(&["a", "b"]);

        let snapshot = reader.get_snapshot();
        assert_eq!(snapshot.statuses.len(), 2);
        assert!(snapshot.statuses.iter().all(|s| !s.online));
        assert_eq!(snapshot.last_update, DateTime::UNIX_EPOCH);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["lastUpdate"], 0);
    }

    #[test]
    fn test_snapshot_reflects_commits_immediately() {
        let (reader, store) = reader_with(&["a", "b"]);
        let now = Utc::now();

        store.commit(ProbeResult::online("b", now, 6)).unwrap();
        let snapshot = reader.get_snapshot();
        assert!(!snapshot.statuses[0].online);
        assert!(snapshot.statuses[1].online);
        assert_eq!(snapshot.last_update, DateTime::UNIX_EPOCH);

        store.set_last_round_completed_at(now);
        let snapshot = reader.get_snapshot();
        assert_eq!(snapshot.last_update.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_get_status() {
        let (reader, store) = reader_with(&["a"]);
        store.commit(ProbeResult::online("a", Utc::now(), 2)).unwrap();

        assert_eq!(reader.get_status("a").unwrap().current_player_count, Some(2));
        assert!(reader.get_status("missing").is_none());
    }
}
