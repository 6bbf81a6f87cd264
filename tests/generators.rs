//! Integration tests for decorated functions that produce iterators.
//!
//! The callback must not fire while the iterator is merely built or partly
//! consumed, only once its execution has unwound. Ownership of the callback
//! moves into the iterator on its first `next`, not when it is built.

use callback_guard::{
    ensure_callback, guard_iter, Arguments, BoundArguments, Callback, CallbackError, Decorated,
    Generator, Signature,
};
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
fn test_called_only_after_exhaustion() {
    let (seen, callback) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb"),
            Generator::new(|_bound| [1, 2]),
        )
        .unwrap();

    let mut iter = g.call(Arguments::new().arg(callback));
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(iter.next(), Some(Ok(1)));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(iter.next(), Some(Ok(2)));
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(iter.next(), None);
    assert_eq!(*seen.lock().unwrap(), ["fallback"]);
    assert!(iter.is_finished());

    // Fused: nothing fires twice.
    assert_eq!(iter.next(), None);
    assert_eq!(*seen.lock().unwrap(), ["fallback"]);
}

#[test]
fn test_collect_receives_all_items() {
    let (seen, callback) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb").param("n"),
            Generator::new(|mut bound: BoundArguments| 0..bound.take::<u32>("n").unwrap()),
        )
        .unwrap();

    let items: Vec<u32> = g
        .call(Arguments::new().arg(callback).arg(4u32))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(items, [0, 1, 2, 3]);
    assert_eq!(*seen.lock().unwrap(), ["fallback"]);
}

#[test]
fn test_called_when_closed_early() {
    let (seen, callback) = recorder();
    let mut iter = guard_iter(callback, "closed", |_cb| 0..);

    assert_eq!(iter.next(), Some(Ok(0)));
    assert_eq!(iter.next(), Some(Ok(1)));
    assert!(seen.lock().unwrap().is_empty());

    drop(iter);
    assert_eq!(*seen.lock().unwrap(), ["closed"]);
}

#[test]
fn test_dropped_unstarted_leaves_callback_with_caller() {
    let started = Arc::new(AtomicBool::new(false));
    let started_clone = started.clone();
    let (seen, callback) = recorder();

    let iter = guard_iter(&callback, "dropped", move |_cb| {
        started_clone.store(true, Ordering::SeqCst);
        vec![1]
    });
    drop(iter);

    assert!(!started.load(Ordering::SeqCst));
    assert!(seen.lock().unwrap().is_empty());
    assert!(callback.is_pending());

    callback.call("caller");
    assert_eq!(*seen.lock().unwrap(), ["caller"]);
}

#[test]
fn test_spent_callback_reported_on_first_next() {
    let (seen, callback) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb"),
            Generator::new(|_bound| vec![1, 2]),
        )
        .unwrap();

    let iter = g.call(Arguments::new().arg(callback.clone()));
    callback.call("caller");

    let items: Vec<_> = iter.collect();
    assert_eq!(items, [Err(CallbackError::AlreadyConsumed)]);
    assert_eq!(*seen.lock().unwrap(), ["caller"]);
}

#[test]
fn test_body_called_back_mid_iteration() {
    let (seen, callback) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb"),
            Generator::new(|mut bound: BoundArguments| {
                let cb: Callback<&'static str> = bound.take("cb").unwrap();
                (1..=3).inspect(move |n| {
                    if *n == 2 {
                        cb.call("from body");
                    }
                })
            }),
        )
        .unwrap();

    let items: Vec<i32> = g
        .call(Arguments::new().arg(callback))
        .map(Result::unwrap)
        .collect();
    assert_eq!(items, [1, 2, 3]);
    assert_eq!(*seen.lock().unwrap(), ["from body"]);
}

#[test]
fn test_called_when_iteration_panics() {
    let (seen, callback) = recorder();
    let mut iter = guard_iter(callback, "panicked", |_cb| {
        (1..).map(|n| if n == 2 { panic!("boom") } else { n })
    });

    assert_eq!(iter.next(), Some(Ok(1)));
    let outcome = catch_unwind(AssertUnwindSafe(|| iter.next()));
    assert!(outcome.is_err());
    assert!(seen.lock().unwrap().is_empty());

    drop(iter);
    assert_eq!(*seen.lock().unwrap(), ["panicked"]);
}

#[test]
fn test_called_when_panic_unwinds_through_iterator() {
    let (seen, callback) = recorder();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let iter = guard_iter(callback, "unwound", |_cb| {
            (1..).map(|n| if n == 3 { panic!("boom") } else { n })
        });
        iter.map(Result::unwrap).sum::<i32>()
    }));

    assert!(outcome.is_err());
    assert_eq!(*seen.lock().unwrap(), ["unwound"]);
}

#[test]
fn test_each_call_builds_its_own_iterator() {
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();
    let g = ensure_callback("cb", "fallback")
        .decorate(
            Signature::new("g").param("cb"),
            Generator::new(|_bound| vec!['a', 'b']),
        )
        .unwrap();

    let mut one = g.call(Arguments::new().arg(first));
    let two: String = g
        .call(Arguments::new().arg(second))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(two, "ab");
    assert_eq!(*second_seen.lock().unwrap(), ["fallback"]);
    assert!(first_seen.lock().unwrap().is_empty());

    assert_eq!(one.next(), Some(Ok('a')));
    drop(one);
    assert_eq!(*first_seen.lock().unwrap(), ["fallback"]);
}

// =============================================================================
// Generators inside a wrapped plain function
// =============================================================================

type Inner = Decorated<
    Generator<fn(BoundArguments) -> Vec<i32>, Vec<i32>>,
    &'static str,
>;

fn two_items(_bound: BoundArguments) -> Vec<i32> {
    vec![1, 2]
}

fn generator_b() -> Inner {
    ensure_callback("cb", "generator b")
        .decorate(
            Signature::new("generator_b").param("cb"),
            Generator::new(two_items as fn(BoundArguments) -> Vec<i32>),
        )
        .unwrap()
}

/// How `function_a` treats the iterator it builds.
#[derive(Clone, Copy)]
enum Use {
    Exhaust,
    Discard,
    CallFirst,
}

ensure_callback! {
    callback = callme, args = "function a fallback";
    fn function_a(callme: Callback<&'static str>, how: Use) -> Vec<Result<i32, CallbackError>> {
        let inner = generator_b();
        let iter = inner.call(Arguments::new().arg(callme.clone()));
        match how {
            Use::Exhaust => iter.collect(),
            Use::Discard => Vec::new(),
            Use::CallFirst => {
                callme.call("function a");
                iter.collect()
            }
        }
    }
}

#[test]
fn test_chain_exhausted_generator_fires_inner_fallback() {
    let (seen, callback) = recorder();
    let items = function_a(callback, Use::Exhaust).unwrap();
    assert_eq!(items, [Ok(1), Ok(2)]);
    assert_eq!(*seen.lock().unwrap(), ["generator b"]);
}

#[test]
fn test_chain_unstarted_generator_fires_outer_fallback() {
    let (seen, callback) = recorder();
    assert!(function_a(callback, Use::Discard).unwrap().is_empty());
    assert_eq!(*seen.lock().unwrap(), ["function a fallback"]);
}

#[test]
fn test_chain_caller_call_wins_over_unstarted_generator() {
    let (seen, callback) = recorder();
    let items = function_a(callback, Use::CallFirst).unwrap();
    assert_eq!(items, [Err(CallbackError::AlreadyConsumed)]);
    assert_eq!(*seen.lock().unwrap(), ["function a"]);
}
