// Prober capability and raw probe results

mod dispatch;
mod tcp;

pub use dispatch::{KindProber, BEDROCK_UNSUPPORTED, TIMEOUT_MESSAGE};
pub use tcp::TcpProber;

use crate::registry::Entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why an entity could not be read
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub message: String,
}

impl ProbeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of one probe attempt against one entity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    pub entity_id: String,
    pub observed_at: DateTime<Utc>,
    pub player_count: Option<u32>,
    pub max_players: Option<u32>,
    pub version: Option<String>,
    /// Server icon, usually a base64 data URI
    pub favicon: Option<String>,
    pub latency_ms: Option<u64>,
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    /// Successful status read
    pub fn online(entity_id: impl Into<String>, observed_at: DateTime<Utc>, player_count: u32) -> Self {
        Self {
            entity_id: entity_id.into(),
            observed_at,
            player_count: Some(player_count),
            max_players: None,
            version: None,
            favicon: None,
            latency_ms: None,
            failure: None,
        }
    }

    /// Entity answered at the transport level but reported no status
    pub fn reachable(entity_id: impl Into<String>, observed_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            entity_id: entity_id.into(),
            observed_at,
            player_count: None,
            max_players: None,
            version: None,
            favicon: None,
            latency_ms: Some(latency_ms),
            failure: None,
        }
    }

    /// Failed probe; every reading is left unknown
    pub fn failed(
        entity_id: impl Into<String>,
        observed_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            observed_at,
            player_count: None,
            max_players: None,
            version: None,
            favicon: None,
            latency_ms: None,
            failure: Some(ProbeFailure::new(message)),
        }
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = Some(max_players);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Online iff a player count was read and no failure was reported
    pub fn is_online(&self) -> bool {
        self.player_count.is_some() && self.failure.is_none()
    }
}

/// Queries a single entity for its current status.
///
/// Implementations must always resolve: connection errors and timeouts are
/// reported through `ProbeResult::failure`, never by hanging past `timeout`.
/// A panic inside `probe` is treated as a fault of that entity only.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, entity: &Entity, timeout: Duration) -> ProbeResult;
}
