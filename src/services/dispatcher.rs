//! Rate-limited provider dispatcher
//!
//! Throttles and queues calls per provider id: a requests-per-second
//! ceiling, a max-in-flight cap, and an exponential backoff window driven by
//! rate-limit signals. All state is per-provider, so one slow or throttled
//! provider can never starve the others. The dispatcher is an explicit,
//! injectable component rather than ambient global state so tests can drive
//! it under paused time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use crate::providers::ProviderError;

/// Per-provider throttling configuration
#[derive(Debug, Clone)]
pub struct ProviderLimits {
    /// Admission ceiling; 1/rps is the minimum inter-call interval
    pub requests_per_second: f64,
    /// Maximum simultaneously in-flight calls
    pub max_in_flight: usize,
    /// Backoff growth factor applied on repeated rate-limit signals
    pub backoff_multiplier: f64,
    /// Upper bound on the backoff window
    pub backoff_ceiling: Duration,
}

impl Default for ProviderLimits {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            max_in_flight: 4,
            backoff_multiplier: 2.0,
            backoff_ceiling: Duration::from_secs(60),
        }
    }
}

/// Pacing and backoff state for one provider
#[derive(Debug, Default)]
struct Pacing {
    last_dispatch: Option<Instant>,
    backoff_until: Option<Instant>,
    current_backoff: Duration,
}

/// Admission gate for one provider id
struct ProviderGate {
    /// Bounds in-flight calls; tokio semaphores queue waiters FIFO
    in_flight: Semaphore,
    pacing: Mutex<Pacing>,
}

/// Rate-limited dispatcher keyed by provider id
pub struct RateLimitedDispatcher {
    limits: HashMap<String, ProviderLimits>,
    default_limits: ProviderLimits,
    gates: Mutex<HashMap<String, Arc<ProviderGate>>>,
}

impl RateLimitedDispatcher {
    pub fn new(limits: HashMap<String, ProviderLimits>) -> Self {
        Self {
            limits,
            default_limits: ProviderLimits::default(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn limits_for(&self, provider_id: &str) -> &ProviderLimits {
        self.limits.get(provider_id).unwrap_or(&self.default_limits)
    }

    async fn gate(&self, provider_id: &str) -> Arc<ProviderGate> {
        let mut gates = self.gates.lock().await;
        if let Some(gate) = gates.get(provider_id) {
            return Arc::clone(gate);
        }
        let limits = self.limits_for(provider_id);
        let gate = Arc::new(ProviderGate {
            in_flight: Semaphore::new(limits.max_in_flight),
            pacing: Mutex::new(Pacing::default()),
        });
        gates.insert(provider_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Run a provider call under this provider's admission rules.
    ///
    /// The call is admitted once an in-flight slot is free, the minimum
    /// inter-call interval has elapsed, and any active backoff window has
    /// passed. A `RateLimited` result widens the backoff window; a clean
    /// response resets it.
    pub async fn dispatch<T, F, Fut>(
        &self,
        provider_id: &str,
        call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let gate = self.gate(provider_id).await;
        let limits = self.limits_for(provider_id).clone();

        let _permit = gate
            .in_flight
            .acquire()
            .await
            .map_err(|_| ProviderError::Network("dispatcher gate closed".to_string()))?;

        let min_interval = Duration::from_secs_f64(1.0 / limits.requests_per_second);

        loop {
            let wait = {
                let mut pacing = gate.pacing.lock().await;
                let now = Instant::now();

                let mut wait = Duration::ZERO;
                if let Some(until) = pacing.backoff_until {
                    if until > now {
                        wait = until - now;
                    }
                }
                if let Some(last) = pacing.last_dispatch {
                    let since = now.duration_since(last);
                    if since < min_interval {
                        wait = wait.max(min_interval - since);
                    }
                }

                if wait.is_zero() {
                    pacing.last_dispatch = Some(now);
                }
                wait
            };

            if wait.is_zero() {
                break;
            }
            tracing::debug!(provider_id, wait_ms = wait.as_millis() as u64, "Throttling provider call");
            tokio::time::sleep(wait).await;
        }

        let result = call().await;

        {
            let mut pacing = gate.pacing.lock().await;
            match &result {
                Ok(_) => {
                    if !pacing.current_backoff.is_zero() {
                        tracing::debug!(provider_id, "Clean response, backoff reset");
                    }
                    pacing.current_backoff = Duration::ZERO;
                    pacing.backoff_until = None;
                }
                Err(ProviderError::RateLimited) => {
                    let next = if pacing.current_backoff.is_zero() {
                        limits.backoff_ceiling / 4
                    } else {
                        pacing
                            .current_backoff
                            .mul_f64(limits.backoff_multiplier)
                            .min(limits.backoff_ceiling)
                    };
                    pacing.current_backoff = next;
                    pacing.backoff_until = Some(Instant::now() + next);
                    tracing::warn!(
                        provider_id,
                        backoff_secs = next.as_secs_f64(),
                        "Provider rate limited, widening backoff window"
                    );
                }
                Err(_) => {}
            }
        }

        result
    }
}
