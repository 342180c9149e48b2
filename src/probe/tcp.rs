//! Reachability prober.
//!
//! Opens a TCP connection to the entity and reports the connect latency.
//! It does not speak the game's status handshake, so the player count stays
//! unknown and a reachable entity still reads as offline. Plug a full status
//! prober in through [`Prober`] for population data.

use super::{ProbeResult, Prober};
use crate::registry::Entity;
use async_trait::async_trait;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, entity: &Entity, timeout: Duration) -> ProbeResult {
        let observed_at = Utc::now();
        let port = entity.address.port_or_default(entity.kind);
        let target = (entity.address.host.as_str(), port);

        let started = Instant::now();
        match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                debug!(entity_id = %entity.id, latency_ms, "TCP connect succeeded");
                ProbeResult::reachable(&entity.id, observed_at, latency_ms)
            }
            Ok(Err(e)) => ProbeResult::failed(&entity.id, observed_at, e.to_string()),
            Err(_) => ProbeResult::failed(&entity.id, observed_at, super::TIMEOUT_MESSAGE),
        }
    }
}
