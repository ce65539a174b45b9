use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde_json::json;

use super::*;
use crate::error::DeliveryError;

/// Test handler that records invocations and optionally rejects.
struct RecordingHandler {
    name: String,
    fail: bool,
    invocations: AtomicUsize,
}

impl RecordingHandler {
    fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            invocations: AtomicUsize::new(0),
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            invocations: AtomicUsize::new(0),
        })
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl MessageHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, _message: &Message) -> Result<(), HandlingError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(HandlingError::Rejected(format!("{} always rejects", self.name)))
        } else {
            Ok(())
        }
    }
}

fn msg() -> Message {
    Message::new(json!("payload")).unwrap()
}

#[test]
fn dispatch_with_no_subscribers_fails_immediately() {
    let dispatcher = UnicastingDispatcher::new();
    match dispatcher.dispatch(&msg()) {
        DispatchOutcome::Failed(attempts) => assert!(attempts.is_empty()),
        DispatchOutcome::Delivered => panic!("nothing to deliver to"),
    }
}

#[test]
fn failover_tries_next_handler_after_rejection() {
    let dispatcher = UnicastingDispatcher::new();
    let a = RecordingHandler::failing("a");
    let b = RecordingHandler::ok("b");
    dispatcher.subscribe(a.clone());
    dispatcher.subscribe(b.clone());

    assert!(dispatcher.dispatch(&msg()).is_delivered());
    assert_eq!(a.invocations(), 1);
    assert_eq!(b.invocations(), 1);
}

#[test]
fn failover_disabled_stops_at_first_rejection() {
    let dispatcher = UnicastingDispatcher::new();
    dispatcher.set_failover(false);
    let a = RecordingHandler::failing("a");
    let b = RecordingHandler::ok("b");
    dispatcher.subscribe(a.clone());
    dispatcher.subscribe(b.clone());

    match dispatcher.dispatch(&msg()) {
        DispatchOutcome::Failed(attempts) => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].handler, "a");
        }
        DispatchOutcome::Delivered => panic!("first handler rejects"),
    }
    assert_eq!(b.invocations(), 0);
}

#[test]
fn all_handlers_failing_aggregates_every_attempt_in_order() {
    let dispatcher = UnicastingDispatcher::new();
    dispatcher.subscribe(RecordingHandler::failing("a"));
    dispatcher.subscribe(RecordingHandler::failing("b"));
    dispatcher.subscribe(RecordingHandler::failing("c"));

    match dispatcher.dispatch(&msg()) {
        DispatchOutcome::Failed(attempts) => {
            let order: Vec<&str> = attempts.iter().map(|a| a.handler.as_str()).collect();
            assert_eq!(order, ["a", "b", "c"]);
        }
        DispatchOutcome::Delivered => panic!("every handler rejects"),
    }
}

#[test]
fn delivery_stops_at_first_success() {
    let dispatcher = UnicastingDispatcher::new();
    let a = RecordingHandler::ok("a");
    let b = RecordingHandler::ok("b");
    dispatcher.subscribe(a.clone());
    dispatcher.subscribe(b.clone());

    assert!(dispatcher.dispatch(&msg()).is_delivered());
    assert_eq!(a.invocations(), 1);
    assert_eq!(b.invocations(), 0);
}

#[test]
fn unsubscribe_removes_by_identity() {
    let dispatcher = UnicastingDispatcher::new();
    let a = RecordingHandler::ok("a");
    let other = RecordingHandler::ok("a");
    let subscribed: Arc<dyn MessageHandler> = a;
    dispatcher.subscribe(subscribed.clone());

    // Same name, different instance: not removed.
    let stranger: Arc<dyn MessageHandler> = other;
    assert!(!dispatcher.unsubscribe(&stranger));
    assert_eq!(dispatcher.handler_count(), 1);

    assert!(dispatcher.unsubscribe(&subscribed));
    assert_eq!(dispatcher.handler_count(), 0);
}

#[test]
fn round_robin_distributes_starts_evenly() {
    let dispatcher =
        UnicastingDispatcher::with_strategy(Box::new(RoundRobinStrategy::default()));
    let handlers = [
        RecordingHandler::ok("a"),
        RecordingHandler::ok("b"),
        RecordingHandler::ok("c"),
    ];
    for handler in &handlers {
        dispatcher.subscribe(handler.clone());
    }

    for _ in 0..9 {
        assert!(dispatcher.dispatch(&msg()).is_delivered());
    }
    for handler in &handlers {
        assert_eq!(handler.invocations(), 3);
    }
}

#[test]
fn round_robin_skips_failed_handler_within_one_dispatch() {
    let dispatcher =
        UnicastingDispatcher::with_strategy(Box::new(RoundRobinStrategy::default()));
    let a = RecordingHandler::failing("a");
    let b = RecordingHandler::ok("b");
    dispatcher.subscribe(a.clone());
    dispatcher.subscribe(b.clone());

    // First dispatch starts at `a`, fails over to `b`.
    assert!(dispatcher.dispatch(&msg()).is_delivered());
    assert_eq!(a.invocations(), 1);
    assert_eq!(b.invocations(), 1);
}

#[test]
fn snapshot_keeps_dispatch_stable_across_unsubscribe() {
    let dispatcher = Arc::new(UnicastingDispatcher::new());
    let b = RecordingHandler::ok("b");
    let b_dyn: Arc<dyn MessageHandler> = b.clone();

    // `a` rejects and unsubscribes `b` mid-dispatch; the in-flight
    // snapshot must still include `b` for the failover step.
    let dispatcher_for_a = dispatcher.clone();
    let b_for_a = b_dyn.clone();
    let a = Arc::new(crate::handler::FnHandler::new("a", move |_| {
        dispatcher_for_a.unsubscribe(&b_for_a);
        Err(HandlingError::Rejected("a rejects".to_string()))
    }));
    dispatcher.subscribe(a);
    dispatcher.subscribe(b_dyn);

    assert!(dispatcher.dispatch(&msg()).is_delivered());
    assert_eq!(b.invocations(), 1);
    assert_eq!(dispatcher.handler_count(), 1);
}

#[test]
fn concurrent_dispatches_cover_handlers_evenly() {
    let dispatcher = Arc::new(UnicastingDispatcher::with_strategy(Box::new(
        RoundRobinStrategy::default(),
    )));
    let handlers = [
        RecordingHandler::ok("a"),
        RecordingHandler::ok("b"),
        RecordingHandler::ok("c"),
    ];
    for handler in &handlers {
        dispatcher.subscribe(handler.clone());
    }

    // 8 threads x 3 dispatches = 24 dispatches; every cursor value is
    // claimed exactly once, so each handler starts 8 times.
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    assert!(dispatcher.dispatch(&msg()).is_delivered());
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    for handler in &handlers {
        assert_eq!(handler.invocations(), 8);
    }
}

#[test]
fn direct_channel_send_surfaces_attempts() {
    use crate::channel::{DirectChannel, MessageChannel};

    let channel = DirectChannel::new("requests");
    channel.subscribe(RecordingHandler::failing("a"));

    let err = channel.send(msg(), None).unwrap_err();
    match err {
        DeliveryError::DispatchFailed { channel, attempts } => {
            assert_eq!(channel, "requests");
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].handler, "a");
        }
        other => panic!("unexpected error: {other}"),
    }
}
