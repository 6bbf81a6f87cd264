//! Asynchronous shapes example for callback-guard.
//!
//! Demonstrates:
//! - An `async fn` wrapped with `ensure_callback!`
//! - A decorated function returning a future
//! - A decorated function returning a stream
//! - Cancelling a wrapped future before it completes
//! - Dropping a wrapped future before it is first polled
//!
//! Run with: `cargo run --example async_shapes`

use callback_guard::{
    ensure_callback, Arguments, AsyncGenerator, BoundArguments, Callback, Coroutine, Signature,
};
use futures_lite::future::{self, block_on};
use futures_lite::stream::{self, StreamExt};

fn report() -> Callback<&'static str> {
    Callback::new(|from: &'static str| println!("   callback called from {from}"))
}

ensure_callback! {
    callback = done, args = "async fn fallback";
    async fn fetch(done: Callback<&'static str>, key: u32) -> Option<String> {
        future::yield_now().await;
        if key == 0 {
            return None;
        }
        done.call("fetch");
        Some(format!("value-{key}"))
    }
}

fn main() {
    println!("=== callback-guard: Async Shapes ===\n");

    // -------------------------------------------------------------------------
    // 1. async fn
    // -------------------------------------------------------------------------
    println!("1. Awaiting a wrapped async fn...");

    println!("   fetch(7) = {:?}", block_on(fetch(report(), 7)));
    println!("   fetch(0) = {:?}", block_on(fetch(report(), 0)));

    // -------------------------------------------------------------------------
    // 2. Coroutine
    // -------------------------------------------------------------------------
    println!("\n2. Decorating a function that returns a future...");

    let double = match ensure_callback("cb", "coroutine fallback").decorate(
        Signature::new("double").param("cb").param("x"),
        Coroutine::new(|mut bound: BoundArguments| async move {
            future::yield_now().await;
            bound.take::<i64>("x").map(|x| x * 2)
        }),
    ) {
        Ok(double) => double,
        Err(e) => {
            println!("   Error: {e}");
            return;
        }
    };

    let fut = double.call(Arguments::new().arg(report()).arg(21i64));
    println!("   double(21) = {:?}", block_on(fut));

    // -------------------------------------------------------------------------
    // 3. Async generator
    // -------------------------------------------------------------------------
    println!("\n3. Decorating a function that returns a stream...");

    let countdown = match ensure_callback("cb", "stream fallback").decorate(
        Signature::new("countdown").param("cb").param_or("from", 3u32),
        AsyncGenerator::new(|mut bound: BoundArguments| {
            let from = bound.take::<u32>("from").unwrap_or(0);
            stream::iter((1..=from).rev())
        }),
    ) {
        Ok(countdown) => countdown,
        Err(e) => {
            println!("   Error: {e}");
            return;
        }
    };

    let mut items = countdown.call(Arguments::new().arg(report()));
    block_on(async {
        while let Some(n) = items.next().await {
            match n {
                Ok(n) => println!("   {n}"),
                Err(e) => println!("   Error: {e}"),
            }
        }
    });

    // -------------------------------------------------------------------------
    // 4. Cancellation
    // -------------------------------------------------------------------------
    println!("\n4. Dropping a suspended future...");

    let mut pending = Box::pin(fetch(report(), 1));
    let polled = block_on(future::poll_once(&mut pending));
    println!("   first poll ready: {}", polled.is_some());
    drop(pending);

    // -------------------------------------------------------------------------
    // 5. Unpolled futures
    // -------------------------------------------------------------------------
    println!("\n5. Dropping a future that was never polled...");

    let callback = report();
    drop(fetch(callback.clone(), 1));
    println!("   caller still owns the callback: {}", callback.is_pending());
    callback.call("main");

    println!("\n=== Example Complete ===");
}
