pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod message;
pub mod telemetry;

pub use channel::{ChannelRef, DirectChannel, MessageChannel, QueueChannel};
pub use config::{DispatchConfig, MessagingConfig, QueueConfig, ReplyConfig};
pub use dispatcher::{
    DispatchOutcome, FailedAttempt, LoadBalancingStrategy, RoundRobinStrategy,
    UnicastingDispatcher,
};
pub use error::{DeliveryError, HandlingError, InvalidArgumentError};
pub use handler::{FnHandler, MessageHandler, Reply, ReplyProducingHandler};
pub use message::{Headers, HeaderValue, Message, MessageBuilder};
