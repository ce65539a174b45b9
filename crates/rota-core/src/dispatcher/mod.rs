use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::error::HandlingError;
use crate::handler::MessageHandler;
use crate::message::Message;

mod load_balancing;
#[cfg(test)]
mod tests;

pub use load_balancing::{LoadBalancingStrategy, RoundRobinStrategy};

/// One failed delivery attempt: which handler rejected the message, and why.
#[derive(Debug)]
pub struct FailedAttempt {
    pub handler: String,
    pub error: HandlingError,
}

/// Result of a dispatch call. `Failed` carries every attempt made, in
/// trial order; an empty list means there were no subscribers at all.
#[derive(Debug)]
#[must_use]
pub enum DispatchOutcome {
    Delivered,
    Failed(Vec<FailedAttempt>),
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered)
    }
}

/// Delivers each message to exactly one handler: the first one, in
/// strategy order, that accepts it. With failover disabled the first
/// rejection is terminal instead.
///
/// Handler invocation is synchronous in the calling thread; the handler
/// list and the failover flag may be mutated while dispatches run on
/// other threads.
pub struct UnicastingDispatcher {
    handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,
    strategy: Option<Box<dyn LoadBalancingStrategy>>,
    failover: AtomicBool,
}

impl Default for UnicastingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UnicastingDispatcher {
    /// Dispatcher without load balancing: handlers are tried in
    /// subscription order. Failover is enabled.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            strategy: None,
            failover: AtomicBool::new(true),
        }
    }

    pub fn with_strategy(strategy: Box<dyn LoadBalancingStrategy>) -> Self {
        Self {
            strategy: Some(strategy),
            ..Self::new()
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        let dispatcher = Self::new();
        dispatcher.set_failover(config.failover);
        dispatcher
    }

    pub fn set_failover(&self, failover: bool) {
        self.failover.store(failover, Ordering::Relaxed);
    }

    pub fn failover(&self) -> bool {
        self.failover.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self, handler: Arc<dyn MessageHandler>) {
        let mut handlers = self.handlers.write().expect("handler list lock poisoned");
        debug!(handler = handler.name(), total = handlers.len() + 1, "handler subscribed");
        handlers.push(handler);
    }

    /// Remove a handler by identity. Returns whether anything was removed.
    pub fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        let mut handlers = self.handlers.write().expect("handler list lock poisoned");
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        before != handlers.len()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().expect("handler list lock poisoned").len()
    }

    /// Stable per-dispatch snapshot: concurrent subscribe/unsubscribe never
    /// changes the set a dispatch in progress iterates.
    fn snapshot(&self) -> Vec<Arc<dyn MessageHandler>> {
        self.handlers.read().expect("handler list lock poisoned").clone()
    }

    #[tracing::instrument(skip_all, fields(message_id = %message.headers().id()))]
    pub fn dispatch(&self, message: &Message) -> DispatchOutcome {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            debug!("no subscribers");
            return DispatchOutcome::Failed(Vec::new());
        }

        let ordered = match &self.strategy {
            Some(strategy) => strategy.order(message, &snapshot),
            None => snapshot,
        };
        let failover = self.failover();

        let mut attempts = Vec::new();
        for handler in ordered {
            match handler.handle(message) {
                Ok(()) => {
                    debug!(handler = handler.name(), "message delivered");
                    return DispatchOutcome::Delivered;
                }
                Err(error) => {
                    if failover {
                        warn!(handler = handler.name(), %error, "handler failed, trying next");
                    } else {
                        debug!(handler = handler.name(), %error, "handler failed, failover disabled");
                    }
                    attempts.push(FailedAttempt {
                        handler: handler.name().to_string(),
                        error,
                    });
                    if !failover {
                        break;
                    }
                }
            }
        }
        DispatchOutcome::Failed(attempts)
    }
}
