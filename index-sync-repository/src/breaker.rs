//! Circuit breaker wrapping the search backend.
//!
//! Prevents a saturated or unreachable backend from stalling the indexing
//! pipeline or the query path with piling latency: fail fast while open,
//! self-heal via probing.
//!
//! # State Machine
//!
//! ```text
//!   Closed ──(window has >= min_samples requests, failure ratio >= trip_ratio)──> Open
//!   Open ──(cooldown elapsed)──> HalfOpen
//!   HalfOpen ──(probe success)──> Closed
//!   HalfOpen ──(probe failure)──> Open
//! ```
//!
//! The breaker is shared by every pipeline worker and the query path, so
//! transitions live behind a mutex: all workers observe Closed→Open→HalfOpen
//! consistently and cannot stampede the backend with probes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::errors::SearchIndexError;

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Minimum number of requests in the window before the breaker may trip.
    pub min_samples: usize,
    /// Failure ratio within the window at or above which the breaker trips.
    pub trip_ratio: f64,
    /// Length of the sliding sample window.
    pub window: Duration,
    /// How long the breaker stays open before allowing probes.
    pub cooldown: Duration,
    /// Maximum number of concurrent probe calls in the half-open state.
    pub half_open_max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            trip_ratio: 0.6,
            window: Duration::from_secs(30),
            cooldown: Duration::from_secs(15),
            half_open_max_probes: 1,
        }
    }
}

/// Breaker state as observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; outcomes are counted in the sliding window.
    Closed,
    /// Calls are rejected immediately without invoking the backend.
    Open,
    /// A limited number of probe calls are allowed through.
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    /// Recent call outcomes: (when, failed).
    samples: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    probes_in_flight: u32,
}

/// Sliding-window circuit breaker.
///
/// Safe for concurrent use; the only state mutated by multiple workers is
/// behind the internal mutex, and critical sections are short.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    rejected: AtomicU64,
    trips: AtomicU64,
}

impl CircuitBreaker {
    /// Create a breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                samples: VecDeque::new(),
                opened_at: None,
                probes_in_flight: 0,
            }),
            rejected: AtomicU64::new(0),
            trips: AtomicU64::new(0),
        }
    }

    /// Create a breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Ask permission to call the backend for the named operation.
    ///
    /// Returns `Err(CircuitOpen)` without touching the backend when the
    /// breaker is open, or when the half-open probe budget is exhausted.
    /// When the cooldown has elapsed this transitions Open to HalfOpen and
    /// admits the caller as a probe.
    pub fn try_acquire(&self, operation: &'static str) -> Result<(), SearchIndexError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.probes_in_flight = 1;
                    info!(operation, "Circuit cooldown elapsed, probing backend");
                    Ok(())
                } else {
                    drop(inner);
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    Err(SearchIndexError::CircuitOpen(operation))
                }
            }
            CircuitState::HalfOpen => {
                if inner.probes_in_flight < self.config.half_open_max_probes {
                    inner.probes_in_flight += 1;
                    Ok(())
                } else {
                    drop(inner);
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    Err(SearchIndexError::CircuitOpen(operation))
                }
            }
        }
    }

    /// Record a successful backend call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.samples.push_back((Instant::now(), false));
                self.prune(&mut inner);
            }
            CircuitState::HalfOpen => {
                // Probe succeeded: the backend has recovered.
                inner.state = CircuitState::Closed;
                inner.samples.clear();
                inner.opened_at = None;
                inner.probes_in_flight = 0;
                info!("Circuit closed: backend recovered");
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed backend call.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.samples.push_back((Instant::now(), true));
                self.prune(&mut inner);

                let total = inner.samples.len();
                let failures = inner.samples.iter().filter(|(_, failed)| *failed).count();
                if total >= self.config.min_samples
                    && failures as f64 / total as f64 >= self.config.trip_ratio
                {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.samples.clear();
                    self.trips.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        failures,
                        total,
                        cooldown_secs = self.config.cooldown.as_secs(),
                        "Circuit opened: backend failing"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Probe failed: back to open, restart the cooldown.
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probes_in_flight = 0;
                warn!("Circuit re-opened: probe failed");
            }
            CircuitState::Open => {}
        }
    }

    /// Current breaker state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Number of calls rejected while open or probe-limited.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Number of Closed to Open transitions since creation.
    pub fn trip_count(&self) -> u64 {
        self.trips.load(Ordering::Relaxed)
    }

    fn prune(&self, inner: &mut Inner) {
        let horizon = self.config.window;
        while inner
            .samples
            .front()
            .map(|(at, _)| at.elapsed() > horizon)
            .unwrap_or(false)
        {
            inner.samples.pop_front();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a panic while counting samples; the counts
        // are advisory, so continue with whatever state is there.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            min_samples: 3,
            trip_ratio: 0.6,
            window: Duration::from_secs(10),
            cooldown: Duration::from_millis(20),
            half_open_max_probes: 1,
        }
    }

    #[test]
    fn test_initial_state_closed() {
        let breaker = CircuitBreaker::new(test_config());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire("query").is_ok());
    }

    #[test]
    fn test_trips_at_failure_ratio() {
        let breaker = CircuitBreaker::new(test_config());

        // Two failures out of two: below the sample minimum, stays closed.
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Third sample reaches min_samples with a 100% failure ratio.
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.trip_count(), 1);
    }

    #[test]
    fn test_does_not_trip_below_ratio() {
        let breaker = CircuitBreaker::new(test_config());

        // 2 failures out of 4 = 50%, below the 60% trip ratio.
        breaker.record_success();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_open_rejects_fast() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = breaker.try_acquire("bulk_upsert").unwrap_err();
        assert!(matches!(err, SearchIndexError::CircuitOpen("bulk_upsert")));
        assert_eq!(breaker.rejected_count(), 1);
    }

    #[test]
    fn test_half_open_after_cooldown_and_recovery() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(30));

        // First caller after cooldown becomes the probe.
        assert!(breaker.try_acquire("query").is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Probe budget is 1: concurrent callers are still rejected.
        assert!(breaker.try_acquire("query").is_err());

        // A single successful probe closes the breaker and resets counters.
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire("query").is_ok());
    }

    #[test]
    fn test_probe_failure_reopens() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            breaker.record_failure();
        }

        std::thread::sleep(Duration::from_millis(30));
        assert!(breaker.try_acquire("query").is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        // Cooldown restarted: still rejecting immediately after the probe.
        assert!(breaker.try_acquire("query").is_err());
    }
}
