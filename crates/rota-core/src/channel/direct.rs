use std::sync::Arc;
use std::time::Duration;

use crate::channel::MessageChannel;
use crate::dispatcher::{
    DispatchOutcome, LoadBalancingStrategy, RoundRobinStrategy, UnicastingDispatcher,
};
use crate::error::DeliveryError;
use crate::handler::MessageHandler;
use crate::message::Message;

/// A channel that invokes a single subscriber per sent message, in the
/// sender's thread. No buffering, no worker: `send` does not return until
/// the whole handler chain (including downstream replies) has completed
/// or failed.
pub struct DirectChannel {
    name: String,
    dispatcher: UnicastingDispatcher,
}

impl DirectChannel {
    /// Create a direct channel with the default round-robin strategy.
    pub fn new(name: &str) -> Self {
        Self::with_strategy(name, Box::new(RoundRobinStrategy::default()))
    }

    /// Create a direct channel with a caller-supplied load-balancing
    /// strategy.
    pub fn with_strategy(name: &str, strategy: Box<dyn LoadBalancingStrategy>) -> Self {
        Self {
            name: name.to_string(),
            dispatcher: UnicastingDispatcher::with_strategy(strategy),
        }
    }

    pub fn subscribe(&self, handler: Arc<dyn MessageHandler>) {
        self.dispatcher.subscribe(handler);
    }

    /// Remove a previously subscribed handler, matched by identity.
    /// Returns whether anything was removed.
    pub fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        self.dispatcher.unsubscribe(handler)
    }

    /// Enable or disable failover on the underlying dispatcher. Enabled by
    /// default.
    pub fn set_failover(&self, failover: bool) {
        self.dispatcher.set_failover(failover);
    }

    pub fn dispatcher(&self) -> &UnicastingDispatcher {
        &self.dispatcher
    }
}

impl MessageChannel for DirectChannel {
    fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch synchronously. The timeout is ignored: there is no queue
    /// to wait on, the call blocks for as long as the handlers run.
    fn send(&self, message: Message, _timeout: Option<Duration>) -> Result<(), DeliveryError> {
        match self.dispatcher.dispatch(&message) {
            DispatchOutcome::Delivered => Ok(()),
            DispatchOutcome::Failed(attempts) => Err(DeliveryError::DispatchFailed {
                channel: self.name.clone(),
                attempts,
            }),
        }
    }
}
