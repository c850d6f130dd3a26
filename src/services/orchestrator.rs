//! Tiered provider orchestrator
//!
//! Runs provider tiers in priority order: each tier's providers fan out
//! concurrently, and the orchestrator advances to the next tier only when the
//! current one yields nothing usable (or only low-quality answers). A
//! provider that errors or times out is silently "no answer" and never aborts
//! its siblings: calls run as detached tasks reporting over a channel, so an
//! early tier decision ignores stragglers rather than cancelling them.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::models::ProductRecord;
use crate::providers::ProviderAdapter;
use crate::services::dispatcher::RateLimitedDispatcher;

/// Quality/completion floor below which a record counts as low-quality for
/// tier escalation
const LOW_QUALITY_THRESHOLD: f64 = 50.0;

/// How a tier decides it is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPolicy {
    /// Tier completes on the first structurally valid record
    FirstMatch,
    /// Tier waits for all providers to settle so fusion sees every answer
    CollectAll,
}

/// A priority group of providers queried together
pub struct Tier {
    pub name: &'static str,
    pub policy: TierPolicy,
    pub providers: Vec<Arc<dyn ProviderAdapter>>,
}

/// Orchestrates tiered, parallel, fault-tolerant provider fan-out
pub struct TieredOrchestrator {
    tiers: Vec<Tier>,
    dispatcher: Arc<RateLimitedDispatcher>,
    call_timeout: Duration,
}

impl TieredOrchestrator {
    pub fn new(
        tiers: Vec<Tier>,
        dispatcher: Arc<RateLimitedDispatcher>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            tiers,
            dispatcher,
            call_timeout,
        }
    }

    /// Resolve a barcode into the partial records fusion should merge.
    ///
    /// Low-quality answers from earlier tiers are carried forward rather than
    /// discarded; the fusion weight table already ranks them down, and fusion
    /// benefits from multiple simultaneous answers.
    pub async fn resolve_partials(&self, barcode: &str) -> Vec<ProductRecord> {
        let mut carried: Vec<ProductRecord> = Vec::new();

        for tier in &self.tiers {
            let records = self.run_tier(tier, barcode).await;

            let usable: Vec<ProductRecord> =
                records.into_iter().filter(|r| r.has_any_data()).collect();

            if usable.is_empty() {
                tracing::debug!(tier = tier.name, barcode, "Tier yielded nothing usable");
                continue;
            }

            let all_low_quality = usable.iter().all(is_low_quality);
            if all_low_quality {
                tracing::debug!(
                    tier = tier.name,
                    barcode,
                    count = usable.len(),
                    "Tier yielded only low-quality records, escalating"
                );
                carried.extend(usable);
                continue;
            }

            tracing::info!(
                tier = tier.name,
                barcode,
                count = usable.len(),
                carried = carried.len(),
                "Tier satisfied resolution"
            );
            carried.extend(usable);
            return carried;
        }

        carried
    }

    /// Fan out one tier. Each provider call runs in its own spawned task with
    /// its own timeout; results arrive over a channel in completion order.
    async fn run_tier(&self, tier: &Tier, barcode: &str) -> Vec<ProductRecord> {
        let (tx, mut rx) = mpsc::channel::<Option<ProductRecord>>(tier.providers.len().max(1));

        for provider in &tier.providers {
            let provider = Arc::clone(provider);
            let dispatcher = Arc::clone(&self.dispatcher);
            let tx = tx.clone();
            let barcode = barcode.to_string();
            let call_timeout = self.call_timeout;

            tokio::spawn(async move {
                let provider_id = provider.id();
                let outcome = tokio::time::timeout(
                    call_timeout,
                    dispatcher.dispatch(provider_id, || provider.fetch(&barcode)),
                )
                .await;

                let record = match outcome {
                    Ok(Ok(Some(record))) => Some(record),
                    Ok(Ok(None)) => {
                        tracing::debug!(provider_id, barcode, "Provider had no answer");
                        None
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(provider_id, barcode, error = %e, "Provider call failed");
                        None
                    }
                    Err(_) => {
                        tracing::debug!(provider_id, barcode, "Provider call timed out");
                        None
                    }
                };

                // Receiver may be gone if the tier already decided; the
                // straggler's answer is simply ignored.
                let _ = tx.send(record).await;
            });
        }
        drop(tx);

        let mut records = Vec::new();
        while let Some(result) = rx.recv().await {
            if let Some(record) = result {
                let valid = record.has_any_data();
                records.push(record);
                if valid && tier.policy == TierPolicy::FirstMatch {
                    break;
                }
            }
        }

        records
    }
}

fn is_low_quality(record: &ProductRecord) -> bool {
    record.quality < LOW_QUALITY_THRESHOLD && record.completion < LOW_QUALITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderAdapter, ProviderError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        id: &'static str,
        record: Option<ProductRecord>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ProviderAdapter for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn fetch(&self, _barcode: &str) -> Result<Option<ProductRecord>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.record.clone())
        }
    }

    fn named_record(barcode: &str, source: &str, quality: f64) -> ProductRecord {
        let mut record = ProductRecord::partial(barcode, source);
        record.name = Some(format!("Product from {source}"));
        record.quality = quality;
        record.completion = quality;
        record
    }

    fn orchestrator(tiers: Vec<Tier>) -> TieredOrchestrator {
        TieredOrchestrator::new(
            tiers,
            Arc::new(RateLimitedDispatcher::new(HashMap::new())),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_escalates_past_empty_tier() {
        let tier1_calls = Arc::new(AtomicUsize::new(0));
        let tier2_calls = Arc::new(AtomicUsize::new(0));
        let tier3_calls = Arc::new(AtomicUsize::new(0));

        let orchestrator = orchestrator(vec![
            Tier {
                name: "generalist",
                policy: TierPolicy::CollectAll,
                providers: vec![Arc::new(MockProvider {
                    id: "empty",
                    record: None,
                    calls: Arc::clone(&tier1_calls),
                })],
            },
            Tier {
                name: "official",
                policy: TierPolicy::CollectAll,
                providers: vec![Arc::new(MockProvider {
                    id: "official",
                    record: Some(named_record("123", "official", 90.0)),
                    calls: Arc::clone(&tier2_calls),
                })],
            },
            Tier {
                name: "fallback",
                policy: TierPolicy::FirstMatch,
                providers: vec![Arc::new(MockProvider {
                    id: "fallback",
                    record: Some(named_record("123", "fallback", 50.0)),
                    calls: Arc::clone(&tier3_calls),
                })],
            },
        ]);

        let records = orchestrator.resolve_partials("123").await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "official");
        assert_eq!(tier1_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tier2_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tier3_calls.load(Ordering::SeqCst), 0, "later tiers never invoked");
    }

    #[tokio::test]
    async fn test_low_quality_records_carried_forward() {
        let orchestrator = orchestrator(vec![
            Tier {
                name: "generalist",
                policy: TierPolicy::CollectAll,
                providers: vec![Arc::new(MockProvider {
                    id: "weak",
                    record: Some(named_record("123", "weak", 20.0)),
                    calls: Arc::new(AtomicUsize::new(0)),
                })],
            },
            Tier {
                name: "official",
                policy: TierPolicy::CollectAll,
                providers: vec![Arc::new(MockProvider {
                    id: "strong",
                    record: Some(named_record("123", "strong", 90.0)),
                    calls: Arc::new(AtomicUsize::new(0)),
                })],
            },
        ]);

        let records = orchestrator.resolve_partials("123").await;

        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.source == "weak"));
        assert!(records.iter().any(|r| r.source == "strong"));
    }

    #[tokio::test]
    async fn test_provider_failure_does_not_abort_siblings() {
        struct FailingProvider;

        #[async_trait]
        impl ProviderAdapter for FailingProvider {
            fn id(&self) -> &'static str {
                "failing"
            }

            async fn fetch(
                &self,
                _barcode: &str,
            ) -> Result<Option<ProductRecord>, ProviderError> {
                Err(ProviderError::Network("connection refused".to_string()))
            }
        }

        let orchestrator = orchestrator(vec![Tier {
            name: "generalist",
            policy: TierPolicy::CollectAll,
            providers: vec![
                Arc::new(FailingProvider),
                Arc::new(MockProvider {
                    id: "healthy",
                    record: Some(named_record("123", "healthy", 80.0)),
                    calls: Arc::new(AtomicUsize::new(0)),
                }),
            ],
        }]);

        let records = orchestrator.resolve_partials("123").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "healthy");
    }

    #[tokio::test]
    async fn test_no_tiers_yields_empty() {
        let orchestrator = orchestrator(vec![]);
        assert!(orchestrator.resolve_partials("123").await.is_empty());
    }
}
