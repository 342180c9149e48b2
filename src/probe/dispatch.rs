use super::{ProbeResult, Prober};
use crate::registry::{Entity, EntityKind};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const TIMEOUT_MESSAGE: &str = "Connection timeout";
pub const BEDROCK_UNSUPPORTED: &str = "Bedrock Edition support coming soon";

/// Routes each entity to the prober for its kind and enforces the time budget.
///
/// Whatever the inner prober does, the returned future resolves within
/// `timeout`; an expired budget becomes a "Connection timeout" failure.
pub struct KindProber {
    java: Arc<dyn Prober>,
}

impl KindProber {
    pub fn new(java: Arc<dyn Prober>) -> Self {
        Self { java }
    }
}

#[async_trait]
impl Prober for KindProber {
    async fn probe(&self, entity: &Entity, timeout: Duration) -> ProbeResult {
        let started_at = Utc::now();

        match entity.kind {
            EntityKind::Java => {
                match tokio::time::timeout(timeout, self.java.probe(entity, timeout)).await {
                    Ok(result) => result,
                    Err(_) => {
                        debug!(
                            entity_id = %entity.id,
                            timeout_ms = timeout.as_millis() as u64,
                            "Probe exceeded its time budget"
                        );
                        ProbeResult::failed(&entity.id, started_at, TIMEOUT_MESSAGE)
                    }
                }
            }
            EntityKind::Bedrock => ProbeResult::failed(&entity.id, started_at, BEDROCK_UNSUPPORTED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServerAddress;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SleepyProber {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for SleepyProber {
        async fn probe(&self, entity: &Entity, _timeout: Duration) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            ProbeResult::online(&entity.id, Utc::now(), 7)
        }
    }

    fn entity(kind: EntityKind) -> Entity {
        Entity {
            id: "srv".to_string(),
            name: "Server".to_string(),
            address: ServerAddress {
                host: "127.0.0.1".to_string(),
                port: None,
            },
            kind,
            color: None,
        }
    }

    #[tokio::test]
    async fn test_java_routed_to_inner_prober() {
        let inner = Arc::new(SleepyProber {
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        });
        let prober = KindProber::new(inner.clone());

        let result = prober
            .probe(&entity(EntityKind::Java), Duration::from_secs(1))
            .await;

        assert!(result.is_online());
        assert_eq!(result.player_count, Some(7));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_synthesizes_failure() {
        let inner = Arc::new(SleepyProber {
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        });
        let prober = KindProber::new(inner);

        let result = prober
            .probe(&entity(EntityKind::Java), Duration::from_millis(50))
            .await;

        assert!(!result.is_online());
        assert_eq!(result.entity_id, "srv");
        assert_eq!(result.failure.unwrap().message, TIMEOUT_MESSAGE);
    }

    #[tokio::test]
    async fn test_bedrock_not_supported() {
        let inner = Arc::new(SleepyProber {
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        });
        let prober = KindProber::new(inner.clone());

        let result = prober
            .probe(&entity(EntityKind::Bedrock), Duration::from_secs(1))
            .await;

        assert_eq!(result.failure.unwrap().message, BEDROCK_UNSUPPORTED);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }
}
