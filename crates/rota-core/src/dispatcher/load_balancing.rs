use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::handler::MessageHandler;
use crate::message::Message;

/// Policy deciding the order in which handlers are tried for one message.
/// Implementations must return a permutation of `handlers`: every element
/// exactly once.
pub trait LoadBalancingStrategy: Send + Sync {
    fn order(
        &self,
        message: &Message,
        handlers: &[Arc<dyn MessageHandler>],
    ) -> Vec<Arc<dyn MessageHandler>>;
}

/// Round-robin: rotates the start offset by one on every call. Across a
/// stable list of `n` handlers, each handler is the first candidate
/// exactly once per `n` consecutive calls, and every call still covers
/// the full list.
///
/// The cursor is scoped to this instance — two dispatchers with their own
/// strategies rotate independently.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    cursor: AtomicUsize,
}

impl LoadBalancingStrategy for RoundRobinStrategy {
    fn order(
        &self,
        _message: &Message,
        handlers: &[Arc<dyn MessageHandler>],
    ) -> Vec<Arc<dyn MessageHandler>> {
        let n = handlers.len();
        if n == 0 {
            return Vec::new();
        }
        // fetch_add wraps on overflow; the modulo keeps the start index in
        // range either way. Only the counter sequence is monotonic — the
        // interleaving of concurrent callers is unordered.
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        let mut ordered = Vec::with_capacity(n);
        ordered.extend_from_slice(&handlers[start..]);
        ordered.extend_from_slice(&handlers[..start]);
        ordered
    }
}
