use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use uuid::Uuid;

use crate::channel::ChannelRef;
use crate::error::InvalidArgumentError;

/// Reserved header key: unique message id, assigned once at construction.
pub const HEADER_ID: &str = "id";
/// Reserved header key: creation time in epoch milliseconds.
pub const HEADER_TIMESTAMP: &str = "timestamp";
/// Reserved header key: reply destination. Producers set it, reply
/// resolution reads it; the core never writes it.
pub const HEADER_REPLY_CHANNEL: &str = "replyChannel";

/// A header value. A closed union instead of an open "any" — the only
/// non-data variant is a channel reference, which compares by identity.
#[derive(Clone)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Json(Value),
    Uuid(Uuid),
    Channel(ChannelRef),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&ChannelRef> {
        match self {
            HeaderValue::Channel(channel) => Some(channel),
            _ => None,
        }
    }
}

impl PartialEq for HeaderValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HeaderValue::Str(a), HeaderValue::Str(b)) => a == b,
            (HeaderValue::Int(a), HeaderValue::Int(b)) => a == b,
            (HeaderValue::Bool(a), HeaderValue::Bool(b)) => a == b,
            (HeaderValue::Json(a), HeaderValue::Json(b)) => a == b,
            (HeaderValue::Uuid(a), HeaderValue::Uuid(b)) => a == b,
            // Channel references are equal only when they point at the
            // same channel instance.
            (HeaderValue::Channel(a), HeaderValue::Channel(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Str(s) => write!(f, "Str({s:?})"),
            HeaderValue::Int(i) => write!(f, "Int({i})"),
            HeaderValue::Bool(b) => write!(f, "Bool({b})"),
            HeaderValue::Json(v) => write!(f, "Json({v})"),
            HeaderValue::Uuid(u) => write!(f, "Uuid({u})"),
            HeaderValue::Channel(c) => write!(f, "Channel({})", c.name()),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<ChannelRef> for HeaderValue {
    fn from(value: ChannelRef) -> Self {
        HeaderValue::Channel(value)
    }
}

/// Immutable header map. Construction copies the caller-supplied map and
/// stamps fresh `id` and `timestamp` entries, overriding any caller value
/// for those keys — the reserved keys are never user-assignable.
#[derive(Debug, Clone, PartialEq)]
pub struct Headers {
    map: HashMap<String, HeaderValue>,
}

impl Headers {
    pub(crate) fn generate(mut map: HashMap<String, HeaderValue>) -> Self {
        map.insert(HEADER_ID.to_string(), HeaderValue::Uuid(Uuid::now_v7()));
        map.insert(HEADER_TIMESTAMP.to_string(), HeaderValue::Int(epoch_millis()));
        Self { map }
    }

    /// The unique message id, assigned at construction.
    pub fn id(&self) -> Uuid {
        match self.map.get(HEADER_ID) {
            Some(HeaderValue::Uuid(id)) => *id,
            // Private map, always stamped by `generate`.
            _ => unreachable!("id header is assigned at construction"),
        }
    }

    /// Creation time in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        match self.map.get(HEADER_TIMESTAMP) {
            Some(HeaderValue::Int(ts)) => *ts,
            _ => unreachable!("timestamp header is assigned at construction"),
        }
    }

    /// The raw `replyChannel` entry, if the producer set one.
    pub fn reply_channel(&self) -> Option<&HeaderValue> {
        self.map.get(HEADER_REPLY_CHANNEL)
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.map.iter()
    }

    pub(crate) fn to_map(&self) -> HashMap<String, HeaderValue> {
        self.map.clone()
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Immutable message envelope: a payload plus headers. Any "modification"
/// produces a new message through [`MessageBuilder`].
#[derive(Debug, Clone)]
pub struct Message {
    payload: Value,
    headers: Headers,
}

impl Message {
    /// Create a message with an empty header map.
    pub fn new(payload: Value) -> Result<Self, InvalidArgumentError> {
        Self::with_headers(payload, HashMap::new())
    }

    /// Create a message, copying the supplied headers. Later mutation of
    /// the source map is invisible to the message.
    pub fn with_headers(
        payload: Value,
        headers: HashMap<String, HeaderValue>,
    ) -> Result<Self, InvalidArgumentError> {
        if payload.is_null() {
            return Err(InvalidArgumentError::NullPayload);
        }
        Ok(Self {
            payload,
            headers: Headers::generate(headers),
        })
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl PartialEq for Message {
    /// Two messages are equal only when their ids, full header maps and
    /// payloads all match. Ids are unique per construction, so a freshly
    /// built message never equals any other.
    fn eq(&self, other: &Self) -> bool {
        if self.headers.id() != other.headers.id() {
            return false;
        }
        self.headers == other.headers && self.payload == other.payload
    }
}

/// Mutable draft for deriving messages. `build` stamps a fresh header map,
/// so a built message always carries its own `id` and `timestamp` even
/// when the draft was seeded from an existing message.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    payload: Value,
    headers: HashMap<String, HeaderValue>,
}

impl MessageBuilder {
    pub fn with_payload(payload: Value) -> Self {
        Self {
            payload,
            headers: HashMap::new(),
        }
    }

    /// Seed the draft from an existing message (payload and headers).
    pub fn from_message(message: &Message) -> Self {
        Self {
            payload: message.payload().clone(),
            headers: message.headers().to_map(),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn set_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn set_header(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(key.to_string(), value.into());
        self
    }

    pub fn set_header_if_absent(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.headers
            .entry(key.to_string())
            .or_insert_with(|| value.into());
        self
    }

    /// Copy every entry of `headers` whose key is absent from the draft.
    /// Never overwrites a key already staged.
    pub fn copy_headers_if_absent(mut self, headers: &Headers) -> Self {
        for (key, value) in headers.iter() {
            self.headers
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    pub fn build(self) -> Result<Message, InvalidArgumentError> {
        Message::with_headers(self.payload, self.headers)
    }
}
