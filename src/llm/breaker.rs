//! Circuit breaker guarding the outbound generation provider.
//!
//! # States
//! - Closed: calls pass through, consecutive failures are counted
//! - Open: calls fail fast with `ServiceUnavailable` and are never attempted
//! - Half-Open: a single probe call is admitted to test recovery
//!
//! # State Transitions
//! ```text
//! Closed    → Open:      consecutive counted failures >= failure_threshold
//! Open      → Half-Open: reset_timeout elapsed since opening (checked in allow())
//! Half-Open → Closed:    probe succeeds
//! Half-Open → Open:      probe fails
//! ```
//!
//! Failures whose kind is in the excluded set (rate limiting, invalid
//! requests, rejected credentials) describe the caller's contract with the
//! provider, not provider health, and never move the breaker.
//!
//! All state lives behind one mutex. Each method holds it for a handful of
//! field updates only; it is never held across the provider call.

use super::error::{ErrorKind, LlmError};
use crate::config::CircuitBreakerConfig;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Failure kinds that do not count toward opening the breaker.
pub const DEFAULT_EXCLUDED_KINDS: [ErrorKind; 3] = [
    ErrorKind::RateLimited,
    ErrorKind::InvalidRequest,
    ErrorKind::AuthenticationFailed,
];

/// Availability gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Numeric encoding used for the state gauge.
    fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable breaker bookkeeping.
#[derive(Debug)]
struct FailureRecord {
    state: CircuitState,
    /// Consecutive counted failures while closed
    consecutive_failures: u32,
    /// When the state last changed
    last_transition: Instant,
    /// When the in-flight half-open probe was admitted
    probe_started: Option<Instant>,
    /// Ticket of the most recently admitted probe
    probe_ticket: u64,
}

/// Admission to make one call through the breaker.
///
/// Carries the probe ticket when the call was admitted as the half-open
/// probe, so that only the probe itself can release the probe slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    probe: Option<u64>,
}

impl Permit {
    pub fn is_probe(&self) -> bool {
        self.probe.is_some()
    }
}

impl FailureRecord {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_transition: Instant::now(),
            probe_started: None,
            probe_ticket: 0,
        }
    }

    fn admit_probe(&mut self) -> u64 {
        self.probe_ticket = self.probe_ticket.wrapping_add(1);
        self.probe_started = Some(Instant::now());
        self.probe_ticket
    }

    /// Move to `to`, returning the `(from, to)` pair if the state changed.
    fn transition(&mut self, to: CircuitState) -> Option<(CircuitState, CircuitState)> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        self.last_transition = Instant::now();
        self.probe_started = None;
        if to != CircuitState::HalfOpen {
            self.consecutive_failures = 0;
        }
        Some((from, to))
    }
}

/// Consecutive-failure circuit breaker.
///
/// Shared by every in-flight request through `Arc<GenerationClient>`.
/// Callers interact through [`allow`](Self::allow) or
/// [`acquire`](Self::acquire), [`on_success`](Self::on_success) and
/// [`on_failure`](Self::on_failure), or through [`call`](Self::call) which
/// wires them around a future.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    excluded_kinds: Vec<ErrorKind>,
    record: Mutex<FailureRecord>,
}

impl CircuitBreaker {
    /// Create a closed breaker from configuration, using the default exclusions.
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            reset_timeout: config.reset_timeout(),
            excluded_kinds: DEFAULT_EXCLUDED_KINDS.to_vec(),
            record: Mutex::new(FailureRecord::new()),
        }
    }

    /// Replace the set of failure kinds that never count toward opening.
    pub fn with_excluded_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.excluded_kinds = kinds.into_iter().collect();
        self
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Whether a failure of this kind is ignored by the breaker.
    pub fn is_excluded(&self, kind: ErrorKind) -> bool {
        self.excluded_kinds.contains(&kind)
    }

    fn lock(&self) -> MutexGuard<'_, FailureRecord> {
        match self.record.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Circuit breaker lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// May a call proceed right now?
    ///
    /// Shorthand for [`acquire`](Self::acquire) when the caller does not
    /// need to report back as the probe.
    pub fn allow(&self) -> bool {
        self.acquire().is_some()
    }

    /// Admit one call, or `None` when the breaker rejects it.
    ///
    /// Performs the Open → Half-Open transition once `reset_timeout` has
    /// elapsed, admitting exactly one probe. A probe that never reports back
    /// is considered abandoned after another `reset_timeout`.
    pub fn acquire(&self) -> Option<Permit> {
        let (permit, change) = {
            let mut record = self.lock();
            match record.state {
                CircuitState::Closed => (Some(Permit { probe: None }), None),
                CircuitState::Open => {
                    if record.last_transition.elapsed() >= self.reset_timeout {
                        let change = record.transition(CircuitState::HalfOpen);
                        let ticket = record.admit_probe();
                        (Some(Permit { probe: Some(ticket) }), change)
                    } else {
                        (None, None)
                    }
                }
                CircuitState::HalfOpen => match record.probe_started {
                    Some(started) if started.elapsed() < self.reset_timeout => (None, None),
                    _ => {
                        let ticket = record.admit_probe();
                        (Some(Permit { probe: Some(ticket) }), None)
                    }
                },
            }
        };

        if let Some((from, to)) = change {
            self.observe_transition(from, to);
        }
        permit
    }

    /// Whether [`acquire`](Self::acquire) would reject a call right now.
    ///
    /// Read-only; never performs the Open → Half-Open transition.
    pub fn is_rejecting(&self) -> bool {
        let record = self.lock();
        match record.state {
            CircuitState::Closed => false,
            CircuitState::Open => record.last_transition.elapsed() < self.reset_timeout,
            CircuitState::HalfOpen => matches!(
                record.probe_started,
                Some(started) if started.elapsed() < self.reset_timeout
            ),
        }
    }

    /// Record a successful call.
    pub fn on_success(&self) {
        let change = {
            let mut record = self.lock();
            match record.state {
                CircuitState::Closed => {
                    record.consecutive_failures = 0;
                    None
                }
                CircuitState::HalfOpen => record.transition(CircuitState::Closed),
                // A call admitted before the breaker opened; the open window stands.
                CircuitState::Open => None,
            }
        };

        debug!("Circuit breaker recorded success");
        if let Some((from, to)) = change {
            self.observe_transition(from, to);
        }
    }

    /// Record a failed call of the given kind.
    ///
    /// An excluded failure reported this way never releases the half-open
    /// probe slot; use [`on_permit_failure`](Self::on_permit_failure) for that.
    pub fn on_failure(&self, kind: ErrorKind) {
        self.record_failure(kind, None);
    }

    /// Record a failed call admitted with `permit`.
    pub fn on_permit_failure(&self, permit: Permit, kind: ErrorKind) {
        self.record_failure(kind, permit.probe);
    }

    fn record_failure(&self, kind: ErrorKind, probe: Option<u64>) {
        if self.is_excluded(kind) {
            let mut record = self.lock();
            if record.state == CircuitState::HalfOpen && probe == Some(record.probe_ticket) {
                // Probe says nothing about provider health; free the slot.
                record.probe_started = None;
            }
            debug!(kind = %kind, "Circuit breaker ignored excluded failure");
            return;
        }

        let change = {
            let mut record = self.lock();
            match record.state {
                CircuitState::Closed => {
                    record.consecutive_failures += 1;
                    if record.consecutive_failures >= self.failure_threshold {
                        record.transition(CircuitState::Open)
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen => record.transition(CircuitState::Open),
                CircuitState::Open => None,
            }
        };

        debug!(kind = %kind, "Circuit breaker recorded failure");
        if let Some((from, to)) = change {
            self.observe_transition(from, to);
        }
    }

    /// Run `op` behind the breaker gate.
    ///
    /// Rejects with [`LlmError::ServiceUnavailable`] without polling `op`
    /// when the breaker does not allow the call; otherwise records the
    /// outcome of `op`.
    pub async fn call<F, Fut, T>(&self, op: F) -> Result<T, LlmError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let Some(permit) = self.acquire() else {
            return Err(LlmError::circuit_open());
        };

        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_permit_failure(permit, e.kind());
                Err(e)
            }
        }
    }

    fn observe_transition(&self, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => {
                warn!(from = %from, to = %to, "Circuit breaker opened for LLM service")
            }
            CircuitState::HalfOpen | CircuitState::Closed => {
                info!(from = %from, to = %to, "Circuit breaker state changed for LLM service")
            }
        }
        crate::metrics::record_circuit_transition(to.as_str(), to.gauge_value());
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CircuitState {
        self.lock().state
    }

    #[cfg(test)]
    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn breaker(threshold: u32, reset_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(&CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout_seconds: reset_secs,
        })
    }

    fn trip(breaker: &CircuitBreaker) {
        for _ in 0..breaker.failure_threshold() {
            assert!(breaker.allow());
            breaker.on_failure(ErrorKind::ConnectionFailed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_closed_and_allows() {
        let cb = breaker(3, 60);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_exactly_threshold_failures() {
        let cb = breaker(3, 60);

        cb.on_failure(ErrorKind::ConnectionFailed);
        cb.on_failure(ErrorKind::TimedOut);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow());

        cb.on_failure(ErrorKind::Unexpected);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!cb.allow(), "must stay open until reset_timeout elapses");
    }

    #[tokio::test(start_paused = true)]
    async fn test_excluded_kinds_never_open() {
        let cb = breaker(3, 60);
        for kind in DEFAULT_EXCLUDED_KINDS {
            for _ in 0..10 {
                assert!(cb.allow());
                cb.on_failure(kind);
            }
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_while_closed_resets_counter() {
        let cb = breaker(3, 60);
        cb.on_failure(ErrorKind::ConnectionFailed);
        cb.on_failure(ErrorKind::ConnectionFailed);
        assert_eq!(cb.consecutive_failures(), 2);

        cb.on_success();
        assert_eq!(cb.consecutive_failures(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.on_failure(ErrorKind::ConnectionFailed);
        cb.on_failure(ErrorKind::ConnectionFailed);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_success_closes() {
        let cb = breaker(3, 60);
        trip(&cb);
        assert!(!cb.allow());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.on_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
        assert!(cb.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_failure_reopens() {
        let cb = breaker(3, 60);
        trip(&cb);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cb.allow());
        cb.on_failure(ErrorKind::ConnectionFailed);

        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());

        // The open window restarts from the failed probe.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!cb.allow());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cb.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_probe() {
        let cb = breaker(2, 10);
        trip(&cb);
        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(cb.allow());
        assert!(!cb.allow(), "second caller must wait for the probe");
        assert!(!cb.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_is_replaced() {
        let cb = breaker(2, 10);
        trip(&cb);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(cb.allow());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_excluded_failure_during_probe_frees_slot() {
        let cb = breaker(2, 10);
        trip(&cb);
        tokio::time::advance(Duration::from_secs(10)).await;

        let probe = cb.acquire().unwrap();
        assert!(probe.is_probe());
        cb.on_permit_failure(probe, ErrorKind::RateLimited);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_excluded_failure_keeps_probe_slot() {
        let cb = breaker(2, 10);
        let stale = cb.acquire().unwrap();
        assert!(!stale.is_probe());
        trip(&cb);
        tokio::time::advance(Duration::from_secs(10)).await;

        let probe = cb.acquire().unwrap();
        assert!(probe.is_probe());
        assert!(!cb.allow());

        // Admitted while closed; reports only after the probe went out.
        cb.on_permit_failure(stale, ErrorKind::RateLimited);
        assert!(!cb.allow(), "probe still in flight");
        cb.on_failure(ErrorKind::InvalidRequest);
        assert!(!cb.allow());

        cb.on_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_cannot_free_replacement_slot() {
        let cb = breaker(2, 10);
        trip(&cb);
        tokio::time::advance(Duration::from_secs(10)).await;
        let abandoned = cb.acquire().unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        let replacement = cb.acquire().unwrap();
        assert_ne!(abandoned, replacement);

        cb.on_permit_failure(abandoned, ErrorKind::RateLimited);
        assert!(!cb.allow());
        cb.on_permit_failure(replacement, ErrorKind::RateLimited);
        assert!(cb.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_rejecting_tracks_gate_without_transitioning() {
        let cb = breaker(2, 10);
        assert!(!cb.is_rejecting());

        trip(&cb);
        assert!(cb.is_rejecting());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!cb.is_rejecting());
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.allow());
        assert!(cb.is_rejecting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_exclusions() {
        let cb = breaker(1, 60).with_excluded_kinds([ErrorKind::TimedOut]);
        cb.on_failure(ErrorKind::TimedOut);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.on_failure(ErrorKind::RateLimited);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_rejects_without_polling_when_open() {
        let cb = breaker(1, 60);
        cb.on_failure(ErrorKind::ConnectionFailed);

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = cb
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ServiceUnavailable);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_records_outcomes() {
        let cb = breaker(2, 60);

        let err: Result<(), _> = cb
            .call(|| async { Err(LlmError::ConnectionFailed("refused".into())) })
            .await;
        assert!(err.is_err());
        assert_eq!(cb.consecutive_failures(), 1);

        let ok = cb.call(|| async { Ok::<_, LlmError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_are_counted_once_each() {
        let cb = Arc::new(breaker(1000, 60));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cb = Arc::clone(&cb);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    cb.on_failure(ErrorKind::ConnectionFailed);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cb.consecutive_failures(), 800);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_open_exactly_once() {
        let cb = Arc::new(breaker(5, 60));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cb = Arc::clone(&cb);
            handles.push(tokio::spawn(async move {
                cb.on_failure(ErrorKind::ConnectionFailed);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cb.state(), CircuitState::Open);
        // Failures recorded while already open are not accumulated.
        assert_eq!(cb.consecutive_failures(), 0);
    }
}
