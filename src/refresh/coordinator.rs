use crate::probe::{ProbeFailure, ProbeResult, Prober};
use crate::registry::{Entity, EntityRegistry};
use crate::status::StatusStore;
use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Failure message recorded in a round report when a probe task panicked
pub const PROBE_TASK_FAILED: &str = "Probe task failed";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh round ended without a report")]
    RoundAborted,
}

/// Compact per-entity outcome of one round
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEntry {
    #[serde(rename = "serverId")]
    pub entity_id: String,
    pub name: String,
    pub player_count: Option<u32>,
    #[serde(rename = "error")]
    pub failure: Option<ProbeFailure>,
}

impl RoundEntry {
    fn from_result(entity: &Entity, result: &ProbeResult) -> Self {
        Self {
            entity_id: entity.id.clone(),
            name: entity.name.clone(),
            player_count: result.player_count,
            failure: result.failure.clone(),
        }
    }
}

/// Summary of a completed round, shared by every caller attached to it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    #[serde(with = "ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub completed_at: DateTime<Utc>,
    /// One entry per entity, in registry order
    pub results: Vec<RoundEntry>,
}

/// Completion signal of the in-flight round; `None` until the round ends
type RoundSignal = watch::Receiver<Option<Arc<RoundReport>>>;

/// Guarded slot holding the in-flight round, if any
type InFlight = Arc<Mutex<Option<RoundSignal>>>;

fn lock_slot(in_flight: &InFlight) -> MutexGuard<'_, Option<RoundSignal>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decides when to probe and makes sure at most one round runs at a time.
///
/// States: idle (slot empty) and round-in-flight (slot holds the round's
/// completion signal). Every caller that arrives while a round is in flight
/// attaches to that round instead of starting another one. Rounds run on
/// their own task, so a caller that goes away never cancels a round.
pub struct RefreshCoordinator {
    registry: Arc<EntityRegistry>,
    store: Arc<StatusStore>,
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    in_flight: InFlight,
}

impl RefreshCoordinator {
    pub fn new(
        registry: Arc<EntityRegistry>,
        store: Arc<StatusStore>,
        prober: Arc<dyn Prober>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            prober,
            probe_timeout,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Make sure the cached data is at most `max_age` old.
    ///
    /// Returns `None` when the cache was already fresh, otherwise the report
    /// of the round this call started or joined.
    pub async fn ensure_fresh(
        &self,
        max_age: Duration,
    ) -> Result<Option<Arc<RoundReport>>, RefreshError> {
        let signal = {
            let mut slot = lock_slot(&self.in_flight);
            match slot.as_ref() {
                Some(signal) => {
                    debug!("Joining in-flight refresh round");
                    signal.clone()
                }
                None if self.store.is_fresh(Utc::now(), max_age) => return Ok(None),
                None => self.start_round(&mut slot),
            }
        };

        wait_for_round(signal).await.map(Some)
    }

    /// Probe everything now, unless a round is already running, in which
    /// case the caller joins it.
    pub async fn force_refresh(&self) -> Result<Arc<RoundReport>, RefreshError> {
        let signal = {
            let mut slot = lock_slot(&self.in_flight);
            self.store.reset_last_round();
            match slot.as_ref() {
                Some(signal) => {
                    debug!("Forced refresh joining in-flight round");
                    signal.clone()
                }
                None => self.start_round(&mut slot),
            }
        };

        wait_for_round(signal).await
    }

    pub fn is_round_in_flight(&self) -> bool {
        lock_slot(&self.in_flight).is_some()
    }

    /// Spawn a round and park its completion signal in `slot`.
    /// Must be called with the slot lock held and the slot empty.
    fn start_round(&self, slot: &mut Option<RoundSignal>) -> RoundSignal {
        let (tx, rx) = watch::channel(None);
        *slot = Some(rx.clone());

        let round = Round {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            prober: Arc::clone(&self.prober),
            probe_timeout: self.probe_timeout,
            in_flight: Arc::clone(&self.in_flight),
        };
        tokio::spawn(round.run(tx));

        rx
    }
}

async fn wait_for_round(mut signal: RoundSignal) -> Result<Arc<RoundReport>, RefreshError> {
    let report = match signal.wait_for(Option::is_some).await {
        Ok(report) => (*report).clone(),
        Err(_) => None,
    };

    report.ok_or(RefreshError::RoundAborted)
}

/// Empties the in-flight slot when the round task ends, even by panic
struct InFlightGuard(InFlight);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock_slot(&self.0).take();
    }
}

/// One pass over every registered entity
struct Round {
    registry: Arc<EntityRegistry>,
    store: Arc<StatusStore>,
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    in_flight: InFlight,
}

impl Round {
    async fn run(self, tx: watch::Sender<Option<Arc<RoundReport>>>) {
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let started_at = Utc::now();
        let started = Instant::now();

        info!(entities = self.registry.len(), "Refreshing server data");

        // Each probe commits as soon as it resolves, so readers see partial
        // results before the round closes.
        let probes = self.registry.list().iter().cloned().map(|entity| {
            let store = Arc::clone(&self.store);
            let prober = Arc::clone(&self.prober);
            let timeout = self.probe_timeout;
            let task_entity = entity.clone();

            let handle = tokio::spawn(async move {
                let entity = task_entity;
                let result = prober.probe(&entity, timeout).await;
                let entry = RoundEntry::from_result(&entity, &result);

                match store.commit(result) {
                    Ok(record) => info!(
                        entity_id = %entity.id,
                        name = %entity.name,
                        player_count = ?record.current_player_count,
                        online = record.online,
                        "Probed server"
                    ),
                    Err(e) => warn!(entity_id = %entity.id, error = %e, "Probe result not committed"),
                }

                entry
            });

            async move { (entity, handle.await) }
        });

        let mut results = Vec::with_capacity(self.registry.len());
        for (entity, outcome) in join_all(probes).await {
            match outcome {
                Ok(entry) => results.push(entry),
                Err(e) => {
                    error!(
                        entity_id = %entity.id,
                        error = %e,
                        "Prober broke its contract; entity skipped this round"
                    );
                    results.push(RoundEntry {
                        entity_id: entity.id,
                        name: entity.name,
                        player_count: None,
                        failure: Some(ProbeFailure::new(PROBE_TASK_FAILED)),
                    });
                }
            }
        }

        self.store.set_last_round_completed_at(started_at);

        let report = Arc::new(RoundReport {
            started_at,
            completed_at: Utc::now(),
            results,
        });

        info!(
            entities = report.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refresh round complete"
        );

        // Back to idle before waking waiters
        drop(guard);
        let _ = tx.send(Some(report));
    }
}
