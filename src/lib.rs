//! # Callback Guard
//!
//! Exactly-once ownership of callbacks handed to a function.
//!
//! A function that receives a callback often has to make sure it is called
//! on every path: normal return, early return, error, panic, a half-consumed
//! iterator, a cancelled future. This crate wraps such a function so that the
//! callback is called exactly once per invocation, either by the function
//! itself, by whatever it delegates to, or, as a fallback, automatically with
//! fixed arguments once the function's execution unwinds.
//!
//! ## Quick Start
//!
//! ```rust
//! use callback_guard::{ensure_callback, release_callback, Callback};
//! use std::sync::{Arc, Mutex};
//!
//! ensure_callback! {
//!     callback = cb, args = "fallback";
//!     fn maybe_reply(cb: Callback<&'static str>, reply: bool) {
//!         if reply {
//!             cb.call("reply");
//!         }
//!     }
//! }
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let record = |seen: &Arc<Mutex<Vec<&'static str>>>| {
//!     let seen = seen.clone();
//!     Callback::new(move |msg| seen.lock().unwrap().push(msg))
//! };
//!
//! maybe_reply(record(&seen), true).unwrap();
//! maybe_reply(record(&seen), false).unwrap();
//! assert_eq!(*seen.lock().unwrap(), ["reply", "fallback"]);
//! ```
//!
//! ## Features
//!
//! - **Ownership token**: [`Callback`] can be called or released once; later
//!   calls are no-ops and later releases are errors
//! - **Four execution shapes**: plain functions, iterators, futures and streams,
//!   each taking over its callback when it starts and finalizing it when its
//!   own execution unwinds
//! - **Chained ownership**: passing a token to another wrapped function moves
//!   the obligation inward, so exactly one fallback fires across the chain
//! - **Runtime binding**: [`Signature`] and [`Arguments`] bind calls by
//!   parameter name, with defaults and catch-all parameters for surplus
//!   positional and keyword values
//! - **Tracing support**: `tracing` events plus an optional event hook
//!
//! ## Main Items
//!
//! - [`ensure_callback!`] - Wrap a plain or `async fn` at compile time
//! - [`ensure_callback()`] / [`EnsureCallback::decorate`] - Wrap a function
//!   described by a [`Signature`]
//! - [`guard`], [`guard_iter`], [`guard_future`], [`guard_stream`] - Wrap a
//!   single body directly
//! - [`release_callback`] - Take a callback out of its token before handing
//!   it to code that is not wrapped
//! - [`set_trace_callback`] - Observe token operations

mod binding;
mod callback;
mod callback_error;
mod callback_event;
mod decorator;
mod finalize;
mod macros;

pub use binding::{Arguments, BoundArguments, ParamKind, Parameter, Signature, Value};
pub use callback::{release_callback, BoxedCallback, Callback, CallbackArg};
pub use callback_error::{CallbackError, ErrorKind};
pub use callback_event::{clear_trace_callback, set_trace_callback, CallbackEvent, TraceCallback};
pub use decorator::{
    ensure_callback, AsyncGenerator, Coroutine, Decorated, EnsureCallback, Generator, PendingCall,
    Plain, Shape, ShapeKind,
};
pub use finalize::{
    guard, guard_future, guard_iter, guard_stream, Finalizer, GuardedFuture, GuardedIter,
    GuardedStream,
};
