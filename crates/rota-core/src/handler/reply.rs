use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::channel::ChannelRef;
use crate::config::ReplyConfig;
use crate::error::{DeliveryError, HandlingError, InvalidArgumentError};
use crate::handler::MessageHandler;
use crate::message::{Headers, Message, MessageBuilder};

/// What a compute function may hand back. A closed union: the compute
/// function states explicitly whether it produced nothing, a plain
/// payload, a finished message, a draft, or a sequence of candidates.
#[derive(Debug)]
pub enum Reply {
    None,
    Payload(Value),
    Message(Message),
    Builder(MessageBuilder),
    Multi(Vec<Reply>),
}

type ComputeFn = Box<dyn Fn(&Message) -> Result<Reply, HandlingError> + Send + Sync>;

/// Handler that computes a reply from each request and sends it onward.
///
/// The destination is the configured output channel when set, otherwise
/// the `replyChannel` reference carried in the request headers. Request
/// headers are copied onto the reply for any key the reply does not
/// already carry (the copy policy can be turned off).
pub struct ReplyProducingHandler {
    name: String,
    compute: ComputeFn,
    output_channel: Option<ChannelRef>,
    send_timeout: Option<Duration>,
    requires_reply: bool,
    copy_request_headers: bool,
}

impl ReplyProducingHandler {
    pub fn new(
        name: &str,
        compute: impl Fn(&Message) -> Result<Reply, HandlingError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            compute: Box::new(compute),
            output_channel: None,
            send_timeout: None,
            requires_reply: false,
            copy_request_headers: true,
        }
    }

    /// Static destination override. When set, the request's `replyChannel`
    /// header is never consulted.
    pub fn set_output_channel(&mut self, channel: ChannelRef) {
        self.output_channel = Some(channel);
    }

    /// Bound for the blocking reply send. `None` blocks indefinitely,
    /// `Some(Duration::ZERO)` never blocks.
    pub fn set_send_timeout(&mut self, timeout: Option<Duration>) {
        self.send_timeout = timeout;
    }

    /// When true, a compute function returning [`Reply::None`] is an error
    /// instead of a silent no-op.
    pub fn set_requires_reply(&mut self, requires_reply: bool) {
        self.requires_reply = requires_reply;
    }

    /// Whether request headers are copied onto replies. On by default.
    pub fn set_copy_request_headers(&mut self, copy: bool) {
        self.copy_request_headers = copy;
    }

    pub fn apply_config(&mut self, config: &ReplyConfig) {
        self.send_timeout = config.send_timeout();
        self.requires_reply = config.requires_reply;
        self.copy_request_headers = config.copy_request_headers;
    }

    fn handle_result(&self, reply: Reply, request: &Headers) -> Result<(), HandlingError> {
        match reply {
            // A sequence is a split only when at least one item is already
            // message-shaped; a sequence of plain values is one payload.
            Reply::Multi(items) if should_split(&items) => {
                for item in items {
                    if matches!(item, Reply::None) {
                        debug!(handler = %self.name, "skipping empty item in split reply");
                        continue;
                    }
                    self.produce_reply(item, request)?;
                }
                Ok(())
            }
            Reply::Multi(items) => self.produce_reply(Reply::Payload(collapse(items)), request),
            item => self.produce_reply(item, request),
        }
    }

    fn produce_reply(&self, item: Reply, request: &Headers) -> Result<(), HandlingError> {
        let message = match item {
            Reply::None => return Ok(()),
            // A finished message passes through untouched unless the copy
            // policy applies; then it is rebuilt with the request headers
            // merged in (and, like every rebuilt message, a fresh id).
            Reply::Message(message) if !self.copy_request_headers => message,
            Reply::Message(message) => self.finish(MessageBuilder::from_message(&message), request)?,
            Reply::Builder(builder) => self.finish(builder, request)?,
            Reply::Payload(payload) => self.finish(MessageBuilder::with_payload(payload), request)?,
            Reply::Multi(items) => {
                self.finish(MessageBuilder::with_payload(collapse(items)), request)?
            }
        };
        self.send_reply(message, request)?;
        Ok(())
    }

    fn finish(
        &self,
        builder: MessageBuilder,
        request: &Headers,
    ) -> Result<Message, InvalidArgumentError> {
        let builder = if self.copy_request_headers {
            builder.copy_headers_if_absent(request)
        } else {
            builder
        };
        builder.build()
    }

    /// Destination resolution, in strict priority order: the configured
    /// output channel, else the request's `replyChannel` header, which must
    /// hold a channel reference.
    fn send_reply(&self, reply: Message, request: &Headers) -> Result<(), DeliveryError> {
        let destination = match &self.output_channel {
            Some(channel) => Arc::clone(channel),
            None => match request.reply_channel() {
                Some(value) => value
                    .as_channel()
                    .cloned()
                    .ok_or(DeliveryError::InvalidReplyChannel)?,
                None => return Err(DeliveryError::NoDestination),
            },
        };
        debug!(
            handler = %self.name,
            channel = destination.name(),
            reply_id = %reply.headers().id(),
            "sending reply"
        );
        destination.send(reply, self.send_timeout)
    }
}

impl MessageHandler for ReplyProducingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, message: &Message) -> Result<(), HandlingError> {
        let reply = (self.compute)(message)?;
        match reply {
            Reply::None if self.requires_reply => Err(HandlingError::ReplyRequired),
            Reply::None => {
                debug!(
                    handler = %self.name,
                    request_id = %message.headers().id(),
                    "no reply produced"
                );
                Ok(())
            }
            other => self.handle_result(other, message.headers()),
        }
    }
}

fn should_split(items: &[Reply]) -> bool {
    items
        .iter()
        .any(|item| matches!(item, Reply::Message(_) | Reply::Builder(_)))
}

/// A sequence with no message-shaped element at the top level is a single
/// payload: the JSON array of its item values. Nested sequences collapse
/// recursively; a message-shaped item buried inside one contributes its
/// payload value.
fn collapse(items: Vec<Reply>) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| match item {
                Reply::None => Value::Null,
                Reply::Payload(value) => value,
                Reply::Multi(nested) => collapse(nested),
                Reply::Message(message) => message.payload().clone(),
                Reply::Builder(builder) => builder.payload().clone(),
            })
            .collect(),
    )
}
