//! Status event sinks.

use std::sync::Arc;

use crate::dispatch::StatusEvent;

/// Receives every status event as it is appended to the dispatcher's log.
///
/// Called after the dispatcher state lock is released, so a sink may read from the
/// dispatcher. Events of one dispatch arrive in log order; events of concurrent
/// dispatches may interleave differently than in `status_log`. Nothing a sink does
/// can change a dispatch outcome.
pub trait StatusSink: Send + Sync {
    fn record(&self, event: &StatusEvent);
}

impl<S: StatusSink + ?Sized> StatusSink for Arc<S> {
    fn record(&self, event: &StatusEvent) {
        (**self).record(event)
    }
}

/// Forwards each event to several sinks in order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn StatusSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn StatusSink>>) -> Self {
        Self { sinks }
    }
}

impl StatusSink for FanoutSink {
    fn record(&self, event: &StatusEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
