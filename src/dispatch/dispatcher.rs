//! The dispatcher: the single entry point for sending messages.
//!
//! # Order of checks in `send`
//! ```text
//! 1. idempotency ledger  → IDEMPOTENT_SKIP (or defer while the same id is in flight)
//! 2. circuit breaker     → CIRCUIT_BREAKER + queue, or reset after cooldown
//! 3. rate limiter        → QUEUED(RATELIMIT) + queue
//! 4. reserve window slot, run RetryFallbackExecutor (lock released)
//! 5. success             → ledger insert, failure counter reset
//! 6. exhaustion          → breaker failure, FAILED + queue + QUEUED(QUEUE)
//! ```
//!
//! # Design Decisions
//! - One `parking_lot::Mutex` guards all mutable state; every check-and-update above is
//!   a single critical section
//! - The lock is never held across a provider call or a backoff sleep
//! - Ids suspended in the executor are tracked as in flight, so a concurrent duplicate is
//!   deferred rather than delivered twice
//! - Nothing is returned as an error: every path ends delivered, skipped, queued or
//!   dead-lettered, with a log entry
//! - A dispatch dropped mid-attempt releases its id and logs `FAILED / CANCELLED`
//! - Events reach the `StatusSink` after the lock is released

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

use crate::config::validation::validate_dispatch;
use crate::config::{ConfigError, DispatchConfig};
use crate::dispatch::clock::{Clock, SystemClock};
use crate::dispatch::message::{
    labels, DeferReason, DispatchOutcome, DispatchStatus, DrainReport, Message, StatusEvent,
};
use crate::dispatch::status::StatusSink;
use crate::error::ExecutorError;
use crate::observability::{metrics, TracingSink};
use crate::providers::ProviderPair;
use crate::resilience::{
    BreakerDecision, CircuitBreaker, CircuitState, RetryFallbackExecutor, SlidingWindowLimiter,
};

struct DispatchState {
    delivered: HashSet<String>,
    in_flight: HashSet<String>,
    pending: VecDeque<Message>,
    dead_letters: Vec<Message>,
    deferrals: HashMap<String, u32>,
    events: Vec<StatusEvent>,
    limiter: SlidingWindowLimiter,
    breaker: CircuitBreaker,
}

pub struct Dispatcher {
    state: Mutex<DispatchState>,
    executor: RetryFallbackExecutor,
    sink: Arc<dyn StatusSink>,
    clock: Arc<dyn Clock>,
    max_deferrals: Option<u32>,
}

pub struct DispatcherBuilder {
    config: DispatchConfig,
    providers: ProviderPair,
    sink: Option<Arc<dyn StatusSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl DispatcherBuilder {
    pub fn sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        validate_dispatch(&self.config).map_err(ConfigError::Validation)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let executor =
            RetryFallbackExecutor::new(self.providers, self.config.retry_policy(), clock.clone());

        tracing::debug!(
            rate_limit_per_minute = self.config.rate_limit_per_minute,
            breaker_threshold = self.config.breaker_threshold,
            breaker_cooldown_ms = self.config.breaker_cooldown_ms,
            max_retries = self.config.max_retries,
            base_backoff_ms = self.config.base_backoff_ms,
            "Dispatcher configured"
        );

        Ok(Dispatcher {
            state: Mutex::new(DispatchState {
                delivered: HashSet::new(),
                in_flight: HashSet::new(),
                pending: VecDeque::new(),
                dead_letters: Vec::new(),
                deferrals: HashMap::new(),
                events: Vec::new(),
                limiter: SlidingWindowLimiter::new(self.config.rate_limit_per_minute),
                breaker: CircuitBreaker::new(
                    self.config.breaker_threshold,
                    self.config.breaker_cooldown(),
                ),
            }),
            executor,
            sink,
            clock,
            max_deferrals: self.config.max_deferrals,
        })
    }
}

impl Dispatcher {
    pub fn builder(config: DispatchConfig, providers: ProviderPair) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            providers,
            sink: None,
            clock: None,
        }
    }

    /// Dispatcher on the system clock, logging status events through tracing.
    pub fn new(config: DispatchConfig, providers: ProviderPair) -> Result<Self, ConfigError> {
        Self::builder(config, providers).build()
    }

    /// Attempt delivery of `message`. Never fails; the outcome says what happened.
    ///
    /// Dropping the returned future mid-attempt releases the id and logs
    /// `FAILED / CANCELLED`. Callers that must not lose the attempt should run it
    /// on its own task.
    pub async fn send(&self, message: Message) -> DispatchOutcome {
        let start = Instant::now();
        let outcome = self.dispatch(message).await;
        metrics::record_send_duration(start);
        outcome
    }

    async fn dispatch(&self, message: Message) -> DispatchOutcome {
        let mut release = {
            let now = self.clock.now();
            let mut state = self.state.lock();
            let mark = state.events.len();

            if let Some(outcome) = self.admit(&mut state, &message, now) {
                self.publish(state, mark);
                return outcome;
            }

            state.limiter.reserve(now);
            state.in_flight.insert(message.id.clone());
            InFlightRelease {
                dispatcher: self,
                message_id: Some(message.id.clone()),
            }
        };

        let result = self
            .executor
            .execute(&message, |status, label| {
                let mut state = self.state.lock();
                let mark = state.events.len();
                self.emit(&mut state, &message.id, status, label);
                self.publish(state, mark);
            })
            .await;

        let now = self.clock.now();
        let mut state = self.state.lock();
        let mark = state.events.len();
        release.disarm();
        state.in_flight.remove(&message.id);

        let outcome = match result {
            Ok(provider) => {
                state.delivered.insert(message.id.clone());
                state.deferrals.remove(&message.id);
                state.dead_letters.retain(|m| m.id != message.id);
                state.breaker.record_success();
                DispatchOutcome::Sent { provider }
            }
            Err(ExecutorError::AllProvidersExhausted { rounds }) => {
                if state.breaker.record_failure(now) {
                    metrics::record_breaker_open(true);
                }
                tracing::warn!(
                    message_id = %message.id,
                    rounds,
                    consecutive_failures = state.breaker.consecutive_failures(),
                    "Delivery failed on every provider"
                );
                self.emit(&mut state, &message.id, DispatchStatus::Failed, labels::FALLBACK_FAILED);
                self.defer(
                    &mut state,
                    message,
                    DispatchStatus::Queued,
                    labels::QUEUE,
                    DispatchOutcome::Failed { rounds },
                )
            }
        };

        self.publish(state, mark);
        outcome
    }

    /// Policy checks ahead of an attempt. `Some` means the message was skipped or
    /// deferred and nothing else is to be done.
    fn admit(
        &self,
        state: &mut DispatchState,
        message: &Message,
        now: Instant,
    ) -> Option<DispatchOutcome> {
        if state.delivered.contains(&message.id) {
            self.emit(state, &message.id, DispatchStatus::IdempotentSkip, labels::IDEMPOTENT_SKIP);
            return Some(DispatchOutcome::Skipped);
        }

        if state.in_flight.contains(&message.id) {
            tracing::debug!(message_id = %message.id, "Same id already in flight, deferring");
            return Some(self.defer(
                state,
                message.clone(),
                DispatchStatus::Queued,
                labels::IN_FLIGHT,
                DispatchOutcome::Deferred { reason: DeferReason::InFlight },
            ));
        }

        match state.breaker.check(now) {
            BreakerDecision::Allow => {}
            BreakerDecision::Reset => metrics::record_breaker_open(false),
            BreakerDecision::Reject { retry_in } => {
                tracing::debug!(
                    message_id = %message.id,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Circuit open, deferring"
                );
                return Some(self.defer(
                    state,
                    message.clone(),
                    DispatchStatus::CircuitBreakerRejected,
                    labels::REJECTED,
                    DispatchOutcome::Deferred { reason: DeferReason::CircuitOpen },
                ));
            }
        }

        if state.limiter.is_limited(now) {
            tracing::debug!(
                message_id = %message.id,
                in_window = state.limiter.in_window(),
                "Rate limit reached, deferring"
            );
            return Some(self.defer(
                state,
                message.clone(),
                DispatchStatus::Queued,
                labels::RATELIMIT,
                DispatchOutcome::Deferred { reason: DeferReason::RateLimited },
            ));
        }

        None
    }

    /// Re-dispatch every queued message once, in order.
    ///
    /// The queue is swapped out first, so anything deferred again during the pass
    /// waits for the next call. Messages not yet replayed are lost if the returned
    /// future is dropped; run it on its own task when the caller may go away.
    pub async fn process_queue(&self) -> DrainReport {
        let snapshot = {
            let mut state = self.state.lock();
            let snapshot = std::mem::take(&mut state.pending);
            metrics::record_queue_depth(0);
            snapshot
        };

        let mut report = DrainReport::default();
        if snapshot.is_empty() {
            return report;
        }

        tracing::info!(count = snapshot.len(), "Draining deferred queue");
        for message in snapshot {
            let outcome = self.send(message).await;
            report.record(&outcome);
        }
        tracing::info!(
            processed = report.processed,
            sent = report.sent,
            deferred = report.deferred,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            "Deferred queue drained"
        );
        report
    }

    /// Snapshot of the event log in causal order.
    pub fn status_log(&self) -> Vec<StatusEvent> {
        self.state.lock().events.clone()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Snapshot of the deferred queue in FIFO order.
    pub fn pending(&self) -> Vec<Message> {
        self.state.lock().pending.iter().cloned().collect()
    }

    pub fn dead_letters(&self) -> Vec<Message> {
        self.state.lock().dead_letters.clone()
    }

    pub fn breaker_state(&self) -> CircuitState {
        self.state.lock().breaker.state()
    }

    pub fn is_delivered(&self, message_id: &str) -> bool {
        self.state.lock().delivered.contains(message_id)
    }

    fn emit(
        &self,
        state: &mut DispatchState,
        message_id: &str,
        status: DispatchStatus,
        provider: impl Into<String>,
    ) {
        let event = StatusEvent {
            message_id: message_id.to_string(),
            status,
            provider: provider.into(),
            timestamp: self.clock.now_utc(),
        };
        metrics::record_status(status);
        state.events.push(event);
    }

    /// Hand the events appended since `mark` to the sink, after releasing the lock.
    fn publish(&self, state: MutexGuard<'_, DispatchState>, mark: usize) {
        let fresh = state.events[mark..].to_vec();
        drop(state);
        for event in &fresh {
            self.sink.record(event);
        }
    }

    /// Put `message` back on the queue, logging `(status, label)`, or dead-letter it
    /// once it has used up `max_deferrals`.
    ///
    /// In-flight deferrals are not counted. A capped message whose id still has a
    /// queued or in-flight copy is folded into that copy instead of dead-lettered.
    fn defer(
        &self,
        state: &mut DispatchState,
        message: Message,
        status: DispatchStatus,
        label: &str,
        outcome: DispatchOutcome,
    ) -> DispatchOutcome {
        let counted = !matches!(
            outcome,
            DispatchOutcome::Deferred { reason: DeferReason::InFlight }
        );
        let deferrals = state.deferrals.get(&message.id).copied().unwrap_or(0);

        if counted && self.max_deferrals.is_some_and(|cap| deferrals >= cap) {
            let live_copy = state.in_flight.contains(&message.id)
                || state.pending.iter().any(|m| m.id == message.id);
            if live_copy {
                tracing::debug!(message_id = %message.id, "Deferral cap reached, folding into live copy");
                self.emit(state, &message.id, status, label);
                return outcome;
            }

            tracing::warn!(message_id = %message.id, deferrals, "Deferral cap reached, dead-lettering");
            self.emit(state, &message.id, DispatchStatus::Failed, labels::DEAD_LETTER);
            state.deferrals.remove(&message.id);
            state.dead_letters.push(message);
            return DispatchOutcome::DeadLettered { deferrals };
        }

        if counted {
            state.deferrals.insert(message.id.clone(), deferrals + 1);
        }
        self.emit(state, &message.id, status, label);
        state.pending.push_back(message);
        metrics::record_queue_depth(state.pending.len());
        outcome
    }
}

/// Releases an id from the in-flight set if its dispatch is dropped before finishing.
struct InFlightRelease<'a> {
    dispatcher: &'a Dispatcher,
    message_id: Option<String>,
}

impl InFlightRelease<'_> {
    fn disarm(&mut self) {
        self.message_id = None;
    }
}

impl Drop for InFlightRelease<'_> {
    fn drop(&mut self) {
        let Some(message_id) = self.message_id.take() else {
            return;
        };

        tracing::warn!(message_id = %message_id, "Dispatch dropped mid-attempt, releasing id");
        let dispatcher = self.dispatcher;
        let mut state = dispatcher.state.lock();
        let mark = state.events.len();
        state.in_flight.remove(&message_id);
        dispatcher.emit(&mut state, &message_id, DispatchStatus::Failed, labels::CANCELLED);
        dispatcher.publish(state, mark);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Dispatcher")
            .field("delivered", &state.delivered.len())
            .field("pending", &state.pending.len())
            .field("events", &state.events.len())
            .field("breaker", &state.breaker.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::clock::ManualClock;
    use crate::providers::MockProvider;
    use std::time::Duration;

    fn email(id: &str) -> Message {
        Message::new(id, "test@example.com", "Test", "This is a test email.")
    }

    fn dispatcher(config: DispatchConfig, primary_ok: bool, secondary_ok: bool) -> (Dispatcher, ManualClock) {
        let clock = ManualClock::new();
        let providers = ProviderPair::new(
            Arc::new(MockProvider::new("ProviderA", if primary_ok { 1.0 } else { 0.0 })),
            Arc::new(MockProvider::new("ProviderB", if secondary_ok { 1.0 } else { 0.0 })),
        );
        let dispatcher = Dispatcher::builder(config, providers)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        (dispatcher, clock)
    }

    #[tokio::test]
    async fn test_send_then_skip() {
        let (d, _) = dispatcher(DispatchConfig::default(), true, true);

        assert_eq!(d.send(email("e1")).await, DispatchOutcome::Sent { provider: "ProviderA".into() });
        assert_eq!(d.send(email("e1")).await, DispatchOutcome::Skipped);

        let statuses: Vec<_> = d.status_log().iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![DispatchStatus::Sent, DispatchStatus::IdempotentSkip]);
        assert!(d.is_delivered("e1"));
    }

    #[tokio::test]
    async fn test_exhaustion_logs_failed_then_queued() {
        let (d, _) = dispatcher(DispatchConfig::default(), false, false);

        assert_eq!(d.send(email("x1")).await, DispatchOutcome::Failed { rounds: 3 });

        let log: Vec<(DispatchStatus, String)> =
            d.status_log().into_iter().map(|e| (e.status, e.provider)).collect();
        assert_eq!(
            log,
            vec![
                (DispatchStatus::Retrying, "Attempt 1".to_string()),
                (DispatchStatus::Retrying, "Attempt 2".to_string()),
                (DispatchStatus::Retrying, "Attempt 3".to_string()),
                (DispatchStatus::Failed, "FALLBACK_FAILED".to_string()),
                (DispatchStatus::Queued, "QUEUE".to_string()),
            ]
        );
        assert_eq!(d.queue_len(), 1);
        assert!(!d.is_delivered("x1"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = DispatchConfig { rate_limit_per_minute: 0, ..DispatchConfig::default() };
        let providers = ProviderPair::new(
            Arc::new(MockProvider::always_ok("A")),
            Arc::new(MockProvider::always_ok("B")),
        );
        assert!(matches!(
            Dispatcher::new(config, providers),
            Err(ConfigError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_dead_letter_after_cap() {
        let config = DispatchConfig {
            rate_limit_per_minute: 1,
            max_deferrals: Some(2),
            ..DispatchConfig::default()
        };
        let (d, _) = dispatcher(config, true, true);

        d.send(email("first")).await;
        assert_eq!(
            d.send(email("late")).await,
            DispatchOutcome::Deferred { reason: DeferReason::RateLimited }
        );
        assert_eq!(d.process_queue().await.deferred, 1);
        assert_eq!(d.process_queue().await.dead_lettered, 1);

        assert_eq!(d.queue_len(), 0);
        assert_eq!(d.dead_letters(), vec![email("late")]);
        let last = d.status_log().pop().unwrap();
        assert_eq!((last.status, last.provider.as_str()), (DispatchStatus::Failed, "DEAD_LETTER"));
    }

    #[tokio::test]
    async fn test_event_timestamps_follow_clock() {
        let (d, clock) = dispatcher(DispatchConfig::default(), true, true);
        d.send(email("t1")).await;
        clock.advance(Duration::from_secs(5));
        d.send(email("t1")).await;

        let log = d.status_log();
        assert_eq!((log[1].timestamp - log[0].timestamp).num_seconds(), 5);
    }

    #[derive(Default)]
    struct ReadsBack {
        target: std::sync::OnceLock<std::sync::Weak<Dispatcher>>,
        seen: Mutex<Vec<usize>>,
    }

    impl StatusSink for ReadsBack {
        fn record(&self, _event: &StatusEvent) {
            if let Some(d) = self.target.get().and_then(std::sync::Weak::upgrade) {
                self.seen.lock().push(d.status_log().len());
            }
        }
    }

    #[tokio::test]
    async fn test_sink_may_read_dispatcher() {
        let sink = Arc::new(ReadsBack::default());
        let providers = ProviderPair::new(
            Arc::new(MockProvider::always_fail("ProviderA")),
            Arc::new(MockProvider::always_ok("ProviderB")),
        );
        let d = Arc::new(
            Dispatcher::builder(DispatchConfig::default(), providers)
                .sink(sink.clone())
                .clock(Arc::new(ManualClock::new()))
                .build()
                .unwrap(),
        );
        sink.target.set(Arc::downgrade(&d)).unwrap();

        d.send(email("r1")).await;
        d.send(email("r1")).await;

        assert_eq!(*sink.seen.lock(), vec![1, 2]);
    }
}
