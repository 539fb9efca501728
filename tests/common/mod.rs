//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use mail_dispatcher::config::DispatchConfig;
use mail_dispatcher::dispatch::{DispatchStatus, ManualClock, Message, StatusEvent, StatusSink};
use mail_dispatcher::error::ProviderError;
use mail_dispatcher::{Dispatcher, Provider, ProviderPair};

/// Provider names in the order they were called, shared between providers.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Provider that follows a fixed script of results, then falls back to `otherwise`.
///
/// Every call yields to the runtime once, so concurrent dispatches interleave.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<bool>>,
    otherwise: bool,
    calls: AtomicUsize,
    journal: Option<Journal>,
}

impl ScriptedProvider {
    pub fn new(name: &str, script: impl IntoIterator<Item = bool>, otherwise: bool) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(script.into_iter().collect()),
            otherwise,
            calls: AtomicUsize::new(0),
            journal: None,
        }
    }

    pub fn ok(name: &str) -> Self {
        Self::new(name, [], true)
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, [], false)
    }

    /// Fails the first `n` calls, succeeds afterwards.
    pub fn failing_first(name: &str, n: usize) -> Self {
        Self::new(name, std::iter::repeat(false).take(n), true)
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _message: &Message) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.lock().push(self.name.clone());
        }
        tokio::task::yield_now().await;

        let ok = self.script.lock().pop_front().unwrap_or(self.otherwise);
        if ok {
            Ok(())
        } else {
            Err(ProviderError::rejected(&self.name, "scripted failure"))
        }
    }
}

/// Provider whose first call never completes; later calls succeed.
pub struct HangsOnce {
    name: String,
    calls: AtomicUsize,
}

impl HangsOnce {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for HangsOnce {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _message: &Message) -> Result<(), ProviderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Sink that keeps every event it receives.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<StatusEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }
}

impl StatusSink for MemorySink {
    fn record(&self, event: &StatusEvent) {
        self.events.lock().push(event.clone());
    }
}

pub fn email(id: &str) -> Message {
    Message::new(id, "test@example.com", "Test", "This is a test email.")
}

/// Dispatcher on a virtual clock over the given providers.
pub fn dispatcher(
    config: DispatchConfig,
    primary: Arc<dyn Provider>,
    secondary: Arc<dyn Provider>,
) -> (Dispatcher, ManualClock) {
    let clock = ManualClock::new();
    let dispatcher = Dispatcher::builder(config, ProviderPair::new(primary, secondary))
        .clock(Arc::new(clock.clone()))
        .build()
        .expect("valid dispatch config");
    (dispatcher, clock)
}

/// `(status, provider)` pairs of the log, in order.
pub fn log_of(dispatcher: &Dispatcher) -> Vec<(DispatchStatus, String)> {
    dispatcher
        .status_log()
        .into_iter()
        .map(|event| (event.status, event.provider))
        .collect()
}

/// Log entries for one message id.
pub fn log_for(dispatcher: &Dispatcher, message_id: &str) -> Vec<(DispatchStatus, String)> {
    dispatcher
        .status_log()
        .into_iter()
        .filter(|event| event.message_id == message_id)
        .map(|event| (event.status, event.provider))
        .collect()
}
