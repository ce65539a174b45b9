use crate::dispatcher::FailedAttempt;

/// Construction errors for the message data model. A message can only be
/// rejected at construction, never after: once built it is immutable.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidArgumentError {
    #[error("payload must not be null")]
    NullPayload,
}

/// A handler rejected a message, or a reply-producing handler could not
/// complete its reply. Within a failover dispatch these are recovered
/// locally and recorded as attempts; the terminal one reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum HandlingError {
    #[error("handler rejected message: {0}")]
    Rejected(String),

    #[error("handler requires a reply, but none was produced")]
    ReplyRequired,

    #[error(transparent)]
    InvalidReply(#[from] InvalidArgumentError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// No resolvable destination, or the resolved destination rejected or
/// timed out the send. Always fatal for the current send call; retry
/// policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("no output channel or replyChannel header available")]
    NoDestination,

    #[error("replyChannel header value is not a channel reference")]
    InvalidReplyChannel,

    #[error("channel '{channel}' rejected the message")]
    SendRejected { channel: String },

    #[error("send to channel '{channel}' timed out")]
    SendTimeout { channel: String },

    #[error("channel '{channel}' is disconnected")]
    Disconnected { channel: String },

    #[error("dispatch on channel '{channel}' failed after {} attempt(s)", attempts.len())]
    DispatchFailed {
        channel: String,
        attempts: Vec<FailedAttempt>,
    },
}
