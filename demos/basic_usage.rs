//! Basic usage example for callback-guard.
//!
//! Demonstrates:
//! - A callback called by the innermost function and by no wrapper
//! - A callback called by a wrapper because no function called it
//! - A released callback that nobody calls
//! - A callback called after a wrapped iterator is exhausted
//!
//! Run with: `cargo run --example basic_usage`

use callback_guard::{ensure_callback, guard_iter, release_callback, Callback};

fn callback_function() -> Callback<&'static str> {
    Callback::new(|description: &'static str| println!("   callback called from {description}"))
}

// =============================================================================
// Wrapped Functions
// =============================================================================

ensure_callback! {
    callback = cb, args = "decorator b";
    fn function_b_calls(cb: Callback<&'static str>) {
        cb.call("function_b");
    }
}

ensure_callback! {
    callback = cb, args = "decorator b";
    fn function_b_returns(cb: Callback<&'static str>) {}
}

ensure_callback! {
    callback = cb, args = "decorator b";
    fn function_b_releases(cb: Callback<&'static str>) {
        if let Err(e) = release_callback(cb) {
            println!("   Error: {e}");
        }
    }
}

ensure_callback! {
    callback = callme, args = "decorator a";
    fn function_a(callme: Callback<&'static str>, inner: fn(Callback<&'static str>) -> Result<(), callback_guard::CallbackError>) {
        if let Err(e) = inner(callme) {
            println!("   Error: {e}");
        }
    }
}

ensure_callback! {
    callback = callme, args = "decorator a";
    fn function_a_iterates(callme: Callback<&'static str>) {
        for x in guard_iter(callme, "generator b", |_cb| [1, 2]) {
            match x {
                Ok(x) => println!("   {x}"),
                Err(e) => println!("   Error: {e}"),
            }
        }
    }
}

fn main() {
    println!("=== callback-guard: Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Direct callback
    // -------------------------------------------------------------------------
    println!("1. function_b calls the callback itself...");

    let _ = function_a(callback_function(), function_b_calls);

    // -------------------------------------------------------------------------
    // 2. Call by wrapper
    // -------------------------------------------------------------------------
    println!("\n2. function_b returns without calling it...");

    let _ = function_a(callback_function(), function_b_returns);

    // -------------------------------------------------------------------------
    // 3. Release
    // -------------------------------------------------------------------------
    println!("\n3. function_b releases it...");

    let _ = function_a(callback_function(), function_b_releases);
    println!("   (nothing called)");

    // -------------------------------------------------------------------------
    // 4. Iterator
    // -------------------------------------------------------------------------
    println!("\n4. function_a iterates a wrapped iterator...");

    let _ = function_a_iterates(callback_function());

    // -------------------------------------------------------------------------
    // 5. Spent callbacks
    // -------------------------------------------------------------------------
    println!("\n5. Handing over a spent callback...");

    let spent = callback_function();
    spent.call("main");
    match function_b_returns(spent) {
        Ok(()) => println!("   Unexpected success"),
        Err(e) => println!("   Error (expected): {e}"),
    }

    println!("\n=== Example Complete ===");
}
