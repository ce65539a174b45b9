use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, SendTimeoutError, TrySendError};
use tracing::debug;

use crate::channel::MessageChannel;
use crate::config::QueueConfig;
use crate::error::DeliveryError;
use crate::message::Message;

/// A pollable channel backed by a bounded or unbounded FIFO queue.
/// Senders block according to the send timeout; receivers poll with
/// `receive` / `receive_timeout`.
pub struct QueueChannel {
    name: String,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl QueueChannel {
    pub fn unbounded(name: &str) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            name: name.to_string(),
            tx,
            rx,
        }
    }

    pub fn bounded(name: &str, capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self {
            name: name.to_string(),
            tx,
            rx,
        }
    }

    pub fn from_config(name: &str, config: &QueueConfig) -> Self {
        match config.capacity {
            Some(capacity) => Self::bounded(name, capacity),
            None => Self::unbounded(name),
        }
    }

    /// Receive the next message, blocking indefinitely. Returns `None`
    /// once every sender is gone.
    pub fn receive(&self) -> Option<Message> {
        self.rx.recv().ok()
    }

    /// Receive the next message, blocking up to `timeout`. Returns `None`
    /// on timeout or disconnect.
    pub fn receive_timeout(&self, timeout: Duration) -> Option<Message> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Non-blocking receive.
    pub fn try_receive(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl MessageChannel for QueueChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: Message, timeout: Option<Duration>) -> Result<(), DeliveryError> {
        debug!(channel = %self.name, message_id = %message.headers().id(), "enqueueing message");
        match timeout {
            None => self
                .tx
                .send(message)
                .map_err(|_| DeliveryError::Disconnected {
                    channel: self.name.clone(),
                }),
            Some(t) if t.is_zero() => self.tx.try_send(message).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::SendRejected {
                    channel: self.name.clone(),
                },
                TrySendError::Disconnected(_) => DeliveryError::Disconnected {
                    channel: self.name.clone(),
                },
            }),
            Some(t) => self.tx.send_timeout(message, t).map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DeliveryError::SendTimeout {
                    channel: self.name.clone(),
                },
                SendTimeoutError::Disconnected(_) => DeliveryError::Disconnected {
                    channel: self.name.clone(),
                },
            }),
        }
    }
}
