use std::time::Duration;

use serde::Deserialize;

/// Top-level messaging configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MessagingConfig {
    pub dispatch: DispatchConfig,
    pub reply: ReplyConfig,
    pub queue: QueueConfig,
}

/// Dispatcher behavior.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Retry delivery against the next handler after a rejection instead
    /// of failing immediately.
    pub failover: bool,
}

/// Reply-producing handler policy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplyConfig {
    /// Blocking bound for reply sends, in milliseconds. Negative means
    /// block indefinitely; zero means never block.
    pub send_timeout_ms: i64,
    /// Whether an incoming message MUST produce a reply.
    pub requires_reply: bool,
    /// Copy request headers onto replies for keys the reply lacks.
    pub copy_request_headers: bool,
}

/// Queue channel sizing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Bounded capacity; `None` means unbounded.
    pub capacity: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { failover: true }
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: -1,
            requires_reply: false,
            copy_request_headers: true,
        }
    }
}

impl ReplyConfig {
    /// The configured timeout as the channel API expects it.
    pub fn send_timeout(&self) -> Option<Duration> {
        if self.send_timeout_ms < 0 {
            None
        } else {
            Some(Duration::from_millis(self.send_timeout_ms as u64))
        }
    }
}
