use crate::error::HandlingError;
use crate::message::Message;

mod reply;

pub use reply::{Reply, ReplyProducingHandler};

/// A message endpoint. Any successful return counts as delivery for
/// dispatch purposes; rejection is signaled through [`HandlingError`].
pub trait MessageHandler: Send + Sync {
    /// Identity used in dispatch attempt reporting and logs.
    fn name(&self) -> &str;

    fn handle(&self, message: &Message) -> Result<(), HandlingError>;
}

/// Adapter turning a plain closure into a handler.
pub struct FnHandler {
    name: String,
    f: Box<dyn Fn(&Message) -> Result<(), HandlingError> + Send + Sync>,
}

impl FnHandler {
    pub fn new(
        name: &str,
        f: impl Fn(&Message) -> Result<(), HandlingError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            f: Box::new(f),
        }
    }
}

impl MessageHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, message: &Message) -> Result<(), HandlingError> {
        (self.f)(message)
    }
}
