//! Integration tests for decorated futures and streams.
//!
//! Like iterators, futures and streams take over the callback on their first
//! poll, so a caller keeps ownership until then.

use callback_guard::{
    ensure_callback, guard_future, guard_stream, Arguments, AsyncGenerator, BoundArguments,
    Callback, CallbackError, Coroutine, ShapeKind, Signature,
};
use futures_lite::future::{self, block_on};
use futures_lite::stream::{self, StreamExt};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, Callback<&'static str>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let callback = Callback::new(move |from: &'static str| seen_clone.lock().unwrap().push(from));
    (seen, callback)
}

#[test]
fn test_coroutine_called_after_completion() {
    let (seen, callback) = recorder();
    let c = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("c").param("cb").param("x"),
            Coroutine::new(|mut bound: BoundArguments| async move {
                future::yield_now().await;
                bound.take::<i32>("x").unwrap() + 1
            }),
        )
        .unwrap();
    assert_eq!(c.shape(), ShapeKind::Coroutine);

    let fut = c.call(Arguments::new().arg(callback).arg(41));
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(block_on(fut), Ok(42));
    assert_eq!(*seen.lock().unwrap(), ["fallback"]);
}

#[test]
fn test_coroutine_not_called_while_suspended() {
    let (seen, callback) = recorder();
    let c = ensure_callback("cb", "cancelled")
        .decorate(
            Signature::new("c").param("cb"),
            Coroutine::new(|_bound| async {
                future::yield_now().await;
                future::yield_now().await;
            }),
        )
        .unwrap();

    let mut fut = Box::pin(c.call(Arguments::new().arg(callback)));
    assert_eq!(block_on(future::poll_once(&mut fut)), None);
    assert!(fut.is_started());
    assert!(seen.lock().unwrap().is_empty());

    // Cancelled while suspended.
    drop(fut);
    assert_eq!(*seen.lock().unwrap(), ["cancelled"]);
}

#[test]
fn test_coroutine_calls_back_itself() {
    let (seen, callback) = recorder();
    let c = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("c").param("cb"),
            Coroutine::new(|mut bound: BoundArguments| async move {
                let cb: Callback<&'static str> = bound.take("cb").unwrap();
                future::yield_now().await;
                cb.call("from body");
            }),
        )
        .unwrap();

    block_on(c.call(Arguments::new().arg(callback))).unwrap();
    assert_eq!(*seen.lock().unwrap(), ["from body"]);
}

#[test]
fn test_coroutine_called_when_body_panics() {
    let (seen, callback) = recorder();
    let fut = guard_future(callback, "panicked", |_cb| async {
        future::yield_now().await;
        panic!("boom");
    });

    let outcome = catch_unwind(AssertUnwindSafe(|| block_on(fut)));
    assert!(outcome.is_err());
    assert_eq!(*seen.lock().unwrap(), ["panicked"]);
}

ensure_callback! {
    callback = cb, args = "async fn";
    async fn async_fn(cb: Callback<&'static str>) {
        future::yield_now().await;
    }
}

#[test]
fn test_spent_callback_reported_on_first_poll() {
    let c = ensure_callback("cb", "runtime async")
        .decorate(
            Signature::new("c").param("cb"),
            Coroutine::new(|_bound| async {}),
        )
        .unwrap();

    let (seen, callback) = recorder();
    let fut = c.call(Arguments::new().arg(callback.clone()));
    callback.call("caller");
    assert_eq!(block_on(fut), Err(CallbackError::AlreadyConsumed));
    assert_eq!(*seen.lock().unwrap(), ["caller"]);

    // The compile-time wrapper behaves the same way.
    let (seen, callback) = recorder();
    let fut = async_fn(callback.clone());
    callback.call("caller");
    assert_eq!(block_on(fut), Err(CallbackError::AlreadyConsumed));
    assert_eq!(*seen.lock().unwrap(), ["caller"]);
}

#[test]
fn test_async_generator_called_after_exhaustion() {
    let (seen, callback) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb"),
            AsyncGenerator::new(|_bound| stream::iter(vec![1, 2])),
        )
        .unwrap();
    assert_eq!(g.shape(), ShapeKind::AsyncGenerator);

    let mut items = g.call(Arguments::new().arg(callback));
    block_on(async {
        assert_eq!(items.next().await, Some(Ok(1)));
        assert_eq!(items.next().await, Some(Ok(2)));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(items.next().await, None);
    });

    assert!(items.is_finished());
    assert_eq!(*seen.lock().unwrap(), ["fallback"]);
}

#[test]
fn test_async_generator_called_when_closed_early() {
    let (seen, callback) = recorder();
    let mut items = guard_stream(callback, "closed", |_cb| stream::repeat(7));

    assert_eq!(block_on(items.next()), Some(Ok(7)));
    assert!(seen.lock().unwrap().is_empty());

    drop(items);
    assert_eq!(*seen.lock().unwrap(), ["closed"]);
}

#[test]
fn test_async_generator_dropped_unstarted() {
    let started = Arc::new(AtomicBool::new(false));
    let started_clone = started.clone();
    let (seen, callback) = recorder();

    let items = guard_stream(&callback, "dropped", move |_cb| {
        started_clone.store(true, Ordering::SeqCst);
        stream::once(1)
    });
    assert!(!items.is_started());
    drop(items);

    assert!(!started.load(Ordering::SeqCst));
    assert!(seen.lock().unwrap().is_empty());
    assert!(callback.is_pending());
}

#[test]
fn test_async_generator_spent_callback_yields_one_error() {
    let (seen, callback) = recorder();
    let items = guard_stream(&callback, "fallback", |_cb| stream::iter(vec![1, 2]));
    callback.call("caller");

    let items: Vec<_> = block_on(items.collect());
    assert_eq!(items, [Err(CallbackError::AlreadyConsumed)]);
    assert_eq!(*seen.lock().unwrap(), ["caller"]);
}

#[test]
fn test_async_generator_suspending_between_items() {
    let (seen, callback) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb"),
            AsyncGenerator::new(|mut bound: BoundArguments| {
                let cb: Callback<&'static str> = bound.take("cb").unwrap();
                Box::pin(stream::unfold(0, move |n| {
                    let cb = cb.clone();
                    async move {
                        future::yield_now().await;
                        if n == 3 {
                            cb.call("end of stream");
                            return None;
                        }
                        Some((n, n + 1))
                    }
                }))
            }),
        )
        .unwrap();

    let items: Vec<i32> = block_on(
        g.call(Arguments::new().arg(callback))
            .map(Result::unwrap)
            .collect(),
    );
    assert_eq!(items, [0, 1, 2]);
    assert_eq!(*seen.lock().unwrap(), ["end of stream"]);
}

// =============================================================================
// Futures and streams inside a wrapped plain function
// =============================================================================

/// How `function_a` treats the future or stream it builds.
#[derive(Clone, Copy)]
enum Use {
    Run,
    Discard,
    CallFirst,
}

ensure_callback! {
    callback = callme, args = "function a fallback";
    fn coroutine_in_a(callme: Callback<&'static str>, how: Use) -> Option<Result<u8, CallbackError>> {
        let fut = guard_future(&callme, "coroutine b", |_cb| async {
            future::yield_now().await;
            7u8
        });
        match how {
            Use::Run => Some(block_on(fut)),
            Use::Discard => None,
            Use::CallFirst => {
                callme.call("function a");
                Some(block_on(fut))
            }
        }
    }
}

ensure_callback! {
    callback = callme, args = "function a fallback";
    fn stream_in_a(callme: Callback<&'static str>, how: Use) -> Vec<Result<u8, CallbackError>> {
        let c = ensure_callback("cb", "stream b")
            .decorate(
                Signature::new("stream_b").param("cb"),
                AsyncGenerator::new(|_bound| stream::iter(vec![1u8, 2])),
            )
            .unwrap();
        let items = c.call(Arguments::new().arg(callme.clone()));
        match how {
            Use::Run => block_on(items.collect()),
            Use::Discard => Vec::new(),
            Use::CallFirst => {
                callme.call("function a");
                block_on(items.collect())
            }
        }
    }
}

#[test]
fn test_chain_completed_coroutine_fires_inner_fallback() {
    let (seen, callback) = recorder();
    assert_eq!(coroutine_in_a(callback, Use::Run), Ok(Some(Ok(7))));
    assert_eq!(*seen.lock().unwrap(), ["coroutine b"]);
}

#[test]
fn test_chain_unstarted_coroutine_fires_outer_fallback() {
    let (seen, callback) = recorder();
    assert_eq!(coroutine_in_a(callback, Use::Discard), Ok(None));
    assert_eq!(*seen.lock().unwrap(), ["function a fallback"]);
}

#[test]
fn test_chain_caller_call_wins_over_unstarted_coroutine() {
    let (seen, callback) = recorder();
    assert_eq!(
        coroutine_in_a(callback, Use::CallFirst),
        Ok(Some(Err(CallbackError::AlreadyConsumed)))
    );
    assert_eq!(*seen.lock().unwrap(), ["function a"]);
}

#[test]
fn test_chain_exhausted_stream_fires_inner_fallback() {
    let (seen, callback) = recorder();
    assert_eq!(stream_in_a(callback, Use::Run).unwrap(), [Ok(1), Ok(2)]);
    assert_eq!(*seen.lock().unwrap(), ["stream b"]);
}

#[test]
fn test_chain_unstarted_stream_fires_outer_fallback() {
    let (seen, callback) = recorder();
    assert!(stream_in_a(callback, Use::Discard).unwrap().is_empty());
    assert_eq!(*seen.lock().unwrap(), ["function a fallback"]);
}

#[test]
fn test_chain_caller_call_wins_over_unstarted_stream() {
    let (seen, callback) = recorder();
    assert_eq!(
        stream_in_a(callback, Use::CallFirst).unwrap(),
        [Err(CallbackError::AlreadyConsumed)]
    );
    assert_eq!(*seen.lock().unwrap(), ["function a"]);
}
