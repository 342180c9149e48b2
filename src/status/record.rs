use crate::probe::{ProbeFailure, ProbeResult};
use crate::registry::Entity;
use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Failure message carried by a record that has never been probed
pub const NOT_YET_PROBED: &str = "Not yet pinged";

/// One sample of the player-count series
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub player_count: Option<u32>,
}

/// Aggregated status of one entity.
///
/// Field names on the wire follow the dashboard's schema (`serverId`,
/// `isOnline`, `graphData`, ...). Timestamps are epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    #[serde(rename = "serverId")]
    pub entity_id: String,

    #[serde(rename = "server")]
    pub entity: Entity,

    pub current_player_count: Option<u32>,
    pub max_players: Option<u32>,
    pub version: Option<String>,
    pub favicon: Option<String>,

    #[serde(rename = "ping")]
    pub latency_ms: Option<u64>,

    #[serde(rename = "isOnline")]
    pub online: bool,

    #[serde(rename = "error")]
    pub failure: Option<ProbeFailure>,

    /// Highest player count ever observed while online
    pub record_player_count: Option<u32>,

    #[serde(rename = "recordTimestamp", with = "ts_milliseconds_option")]
    pub record_observed_at: Option<DateTime<Utc>>,

    /// Last K samples, oldest first
    #[serde(rename = "graphData")]
    pub history: VecDeque<HistoryPoint>,

    #[serde(with = "ts_milliseconds")]
    pub last_update: DateTime<Utc>,
}

impl StatusRecord {
    /// Record for an entity that has not been probed yet
    pub fn not_yet_probed(entity: Entity, at: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity.id.clone(),
            entity,
            current_player_count: None,
            max_players: None,
            version: None,
            favicon: None,
            latency_ms: None,
            online: false,
            failure: Some(ProbeFailure::new(NOT_YET_PROBED)),
            record_player_count: None,
            record_observed_at: None,
            history: VecDeque::new(),
            last_update: at,
        }
    }

    /// Build the replacement record for `result`.
    ///
    /// Current readings come from the probe; the record and the history are
    /// carried forward from `self`. The history keeps at most `history_len`
    /// points, dropping the oldest first.
    pub(crate) fn next(&self, result: &ProbeResult, history_len: usize) -> Self {
        let online = result.is_online();

        let (mut record_player_count, mut record_observed_at) =
            (self.record_player_count, self.record_observed_at);
        if let (true, Some(count)) = (online, result.player_count) {
            if record_player_count.map_or(true, |record| count > record) {
                record_player_count = Some(count);
                record_observed_at = Some(result.observed_at);
            }
        }

        let mut history = self.history.clone();
        history.push_back(HistoryPoint {
            timestamp: result.observed_at,
            player_count: result.player_count,
        });
        while history.len() > history_len {
            history.pop_front();
        }

        Self {
            entity_id: self.entity_id.clone(),
            entity: self.entity.clone(),
            // An offline record never exposes a stale count
            current_player_count: if online { result.player_count } else { None },
            max_players: result.max_players,
            version: result.version.clone(),
            favicon: result.favicon.clone(),
            latency_ms: result.latency_ms,
            online,
            failure: result.failure.clone(),
            record_player_count,
            record_observed_at,
            history,
            last_update: result.observed_at,
        }
    }
}
