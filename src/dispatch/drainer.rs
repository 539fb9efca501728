//! Background replay of the deferred queue.
//!
//! # Responsibilities
//! - Periodically call `process_queue` on the shared dispatcher
//! - Stop cleanly on the shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::dispatch::Dispatcher;

pub struct QueueDrainer {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
}

impl QueueDrainer {
    pub fn new(dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Queue drainer disabled");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Queue drainer starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.dispatcher.queue_len() > 0 {
                        self.dispatcher.process_queue().await;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Queue drainer received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::dispatch::{DispatchOutcome, Message};
    use crate::lifecycle::Shutdown;
    use crate::providers::{MockProvider, ProviderPair};

    #[tokio::test]
    async fn test_drains_until_shutdown() {
        let providers = ProviderPair::new(
            Arc::new(MockProvider::always_ok("ProviderA")),
            Arc::new(MockProvider::always_ok("ProviderB")),
        );
        let config = DispatchConfig {
            rate_limit_per_minute: 1,
            ..DispatchConfig::default()
        };
        let dispatcher = Arc::new(Dispatcher::new(config, providers).unwrap());

        // Fill the window so the next message is deferred.
        dispatcher.send(Message::new("a", "x@example.com", "s", "b")).await;
        let deferred = dispatcher.send(Message::new("b", "x@example.com", "s", "b")).await;
        assert!(matches!(deferred, DispatchOutcome::Deferred { .. }));

        let shutdown = Shutdown::new();
        let drainer = QueueDrainer::new(dispatcher.clone(), Duration::from_millis(10));
        let handle = tokio::spawn(drainer.run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
        handle.await.unwrap();

        // Still rate limited, so the message went around the queue at least once.
        assert_eq!(dispatcher.queue_len(), 1);
        assert!(dispatcher.status_log().iter().filter(|e| e.message_id == "b").count() >= 2);
    }
}
