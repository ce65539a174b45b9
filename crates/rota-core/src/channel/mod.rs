use std::sync::Arc;
use std::time::Duration;

use crate::error::DeliveryError;
use crate::message::Message;

mod direct;
mod queue;

pub use direct::DirectChannel;
pub use queue::QueueChannel;

/// A named send-point. Sending hands the message to whatever sits behind
/// the channel: a dispatcher for [`DirectChannel`], a queue for
/// [`QueueChannel`].
pub trait MessageChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Send a message. The timeout bounds how long the call may block:
    /// `None` blocks indefinitely, `Some(Duration::ZERO)` fails immediately
    /// when the message cannot be accepted right away, `Some(d)` blocks up
    /// to `d`. Channels that never block ignore it.
    fn send(&self, message: Message, timeout: Option<Duration>) -> Result<(), DeliveryError>;
}

/// Shared reference to a channel. Carried inside `replyChannel` headers
/// and handler configuration; compares by identity.
pub type ChannelRef = Arc<dyn MessageChannel>;
