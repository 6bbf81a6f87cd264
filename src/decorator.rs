//! Decorating a function so its callback argument fires exactly once.
//!
//! [`ensure_callback`] captures the name of the callback parameter and the
//! fixed fallback arguments. [`EnsureCallback::decorate`] checks the target's
//! [`Signature`] and pairs it with one of four [`Shape`] strategies. Every
//! call of the resulting [`Decorated`] binds its arguments, swaps the callback
//! for a fresh [`Callback`] token, runs the body and finalizes the token when
//! the body unwinds.
//!
//! A [`Plain`] body does all of that inside [`Decorated::call`]. The lazy
//! shapes return an iterator, future or stream at once and do it when that is
//! first advanced, so until then the caller keeps ownership of its callback.
//!
//! # Examples
//!
//! ```
//! use callback_guard::{ensure_callback, Arguments, Callback, Plain, Signature};
//! use std::sync::{Arc, Mutex};
//!
//! let decorated = ensure_callback("cb", "decorator")
//!     .decorate(
//!         Signature::new("function").param("cb"),
//!         Plain::new(|_bound| ()),
//!     )
//!     .unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_clone = seen.clone();
//! let callback = Callback::new(move |from: &'static str| seen_clone.lock().unwrap().push(from));
//!
//! decorated.call(Arguments::new().arg(callback)).unwrap();
//! assert_eq!(*seen.lock().unwrap(), ["decorator"]);
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_lite::Stream;

use crate::binding::{Arguments, BoundArguments, Signature, Value};
use crate::callback::{BoxedCallback, Callback, CallbackArg};
use crate::finalize::{take_over, Finalizer, GuardedFuture, GuardedIter, GuardedStream};
use crate::CallbackError;

/// The evaluation model of a decorated function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Returns a value.
    Plain,
    /// Returns a lazy iterator.
    Generator,
    /// Returns a future.
    Coroutine,
    /// Returns a lazy stream.
    AsyncGenerator,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Plain => write!(f, "plain"),
            ShapeKind::Generator => write!(f, "generator"),
            ShapeKind::Coroutine => write!(f, "coroutine"),
            ShapeKind::AsyncGenerator => write!(f, "async generator"),
        }
    }
}

/// Strategy attaching a call's finalizer to the body's execution.
///
/// Implemented by [`Plain`], [`Generator`], [`Coroutine`] and
/// [`AsyncGenerator`]. `run` receives the not-yet-started call. It decides
/// when [`PendingCall::start`] runs and must drop or finish the returned
/// finalizer exactly when the body's execution has unwound.
pub trait Shape<A, R> {
    type Output;

    const KIND: ShapeKind;

    fn run(&self, call: PendingCall<A, R>) -> Self::Output;
}

/// One call of a [`Decorated`] function whose arguments are not bound yet.
pub struct PendingCall<A, R = ()> {
    signature: Arc<Signature>,
    callback_name: &'static str,
    callback_args: A,
    arguments: Arguments,
    _result: PhantomData<fn() -> R>,
}

impl<A, R> PendingCall<A, R>
where
    A: 'static,
    R: 'static,
{
    /// Binds the arguments and takes over the callback argument.
    ///
    /// On success the bound callback slot holds a fresh token, and the
    /// returned finalizer falls back to calling it.
    ///
    /// # Errors
    ///
    /// A binding error if the arguments do not fit the signature or the
    /// callback argument has the wrong type, or
    /// [`CallbackError::AlreadyConsumed`] if it is a spent token.
    pub fn start(self) -> Result<(BoundArguments, Finalizer<A, R>), CallbackError> {
        let mut bound = self.signature.bind(self.arguments)?;
        let finalizer = bind_callback(&mut bound, self.callback_name, self.callback_args)?;
        Ok((bound, finalizer))
    }
}

impl<A: fmt::Debug, R> fmt::Debug for PendingCall<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("function", &self.signature.function())
            .field("callback_name", &self.callback_name)
            .field("callback_args", &self.callback_args)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// A body that returns its result directly.
pub struct Plain<F, T> {
    body: F,
    _output: PhantomData<fn() -> T>,
}

impl<F, T> Plain<F, T>
where
    F: Fn(BoundArguments) -> T,
{
    pub fn new(body: F) -> Self {
        Self {
            body,
            _output: PhantomData,
        }
    }
}

impl<A, R, F, T> Shape<A, R> for Plain<F, T>
where
    F: Fn(BoundArguments) -> T,
    A: 'static,
    R: 'static,
{
    type Output = Result<T, CallbackError>;

    const KIND: ShapeKind = ShapeKind::Plain;

    fn run(&self, call: PendingCall<A, R>) -> Self::Output {
        let (bound, finalizer) = call.start()?;
        let output = (self.body)(bound);
        drop(finalizer);
        Ok(output)
    }
}

/// A body that produces an iterator, started on the first `next`.
pub struct Generator<F, I> {
    body: Arc<F>,
    _output: PhantomData<fn() -> I>,
}

impl<F, I> Generator<F, I>
where
    F: Fn(BoundArguments) -> I + Send + Sync + 'static,
    I: IntoIterator,
{
    pub fn new(body: F) -> Self {
        Self {
            body: Arc::new(body),
            _output: PhantomData,
        }
    }
}

impl<A, R, F, I> Shape<A, R> for Generator<F, I>
where
    F: Fn(BoundArguments) -> I + Send + Sync + 'static,
    I: IntoIterator,
    A: Send + 'static,
    R: 'static,
{
    type Output = GuardedIter<I::IntoIter, A, R>;

    const KIND: ShapeKind = ShapeKind::Generator;

    fn run(&self, call: PendingCall<A, R>) -> Self::Output {
        let body = Arc::clone(&self.body);
        GuardedIter::deferred(Box::new(move || {
            let (bound, finalizer) = call.start()?;
            Ok((body(bound).into_iter(), finalizer))
        }))
    }
}

/// A body that produces a future, built on the first poll.
pub struct Coroutine<F, Fut> {
    body: Arc<F>,
    _output: PhantomData<fn() -> Fut>,
}

impl<F, Fut> Coroutine<F, Fut>
where
    F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
    Fut: Future,
{
    pub fn new(body: F) -> Self {
        Self {
            body: Arc::new(body),
            _output: PhantomData,
        }
    }
}

impl<A, R, F, Fut> Shape<A, R> for Coroutine<F, Fut>
where
    F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
    Fut: Future,
    A: Send + 'static,
    R: 'static,
{
    type Output = GuardedFuture<Fut, A, R>;

    const KIND: ShapeKind = ShapeKind::Coroutine;

    fn run(&self, call: PendingCall<A, R>) -> Self::Output {
        let body = Arc::clone(&self.body);
        GuardedFuture::deferred(Box::new(move || {
            let (bound, finalizer) = call.start()?;
            Ok((body(bound), finalizer))
        }))
    }
}

/// A body that produces a stream, started on the first poll.
pub struct AsyncGenerator<F, St> {
    body: Arc<F>,
    _output: PhantomData<fn() -> St>,
}

impl<F, St> AsyncGenerator<F, St>
where
    F: Fn(BoundArguments) -> St + Send + Sync + 'static,
    St: Stream,
{
    pub fn new(body: F) -> Self {
        Self {
            body: Arc::new(body),
            _output: PhantomData,
        }
    }
}

impl<A, R, F, St> Shape<A, R> for AsyncGenerator<F, St>
where
    F: Fn(BoundArguments) -> St + Send + Sync + 'static,
    St: Stream,
    A: Send + 'static,
    R: 'static,
{
    type Output = GuardedStream<St, A, R>;

    const KIND: ShapeKind = ShapeKind::AsyncGenerator;

    fn run(&self, call: PendingCall<A, R>) -> Self::Output {
        let body = Arc::clone(&self.body);
        GuardedStream::deferred(Box::new(move || {
            let (bound, finalizer) = call.start()?;
            Ok((body(bound), finalizer))
        }))
    }
}

/// Decoration-time configuration: which parameter carries the callback and
/// what to call it with if nobody else does.
#[derive(Debug, Clone)]
pub struct EnsureCallback<A, R = ()> {
    callback_name: &'static str,
    callback_args: A,
    _result: PhantomData<fn() -> R>,
}

/// Configures a decorator for functions whose `callback_name` parameter
/// carries a callback returning `()`.
///
/// The callback will be called with `callback_args` when the decorated
/// function exits, unless it was called, released, or passed on to another
/// decorated function in the meantime. Use [`EnsureCallback::new`] for
/// callbacks with a result type.
pub fn ensure_callback<A>(callback_name: &'static str, callback_args: A) -> EnsureCallback<A> {
    EnsureCallback::new(callback_name, callback_args)
}

impl<A, R> EnsureCallback<A, R> {
    pub fn new(callback_name: &'static str, callback_args: A) -> Self {
        Self {
            callback_name,
            callback_args,
            _result: PhantomData,
        }
    }
}

impl<A, R> EnsureCallback<A, R>
where
    A: Clone + 'static,
    R: 'static,
{
    pub fn callback_name(&self) -> &'static str {
        self.callback_name
    }

    pub fn callback_args(&self) -> &A {
        &self.callback_args
    }

    /// Wraps `target`, whose parameters are declared by `signature`.
    ///
    /// # Errors
    ///
    /// [`CallbackError::MissingParameter`] if `signature` declares no
    /// parameter called `callback_name`.
    pub fn decorate<S>(
        &self,
        signature: Signature,
        target: S,
    ) -> Result<Decorated<S, A, R>, CallbackError>
    where
        S: Shape<A, R>,
    {
        if !signature.contains(self.callback_name) {
            return Err(CallbackError::MissingParameter {
                function: signature.function().to_string(),
                parameter: self.callback_name.to_string(),
            });
        }

        tracing::debug!(
            function = signature.function(),
            callback = self.callback_name,
            shape = %S::KIND,
            "decorated function"
        );

        Ok(Decorated {
            signature: Arc::new(signature),
            callback_name: self.callback_name,
            callback_args: self.callback_args.clone(),
            target,
            _result: PhantomData,
        })
    }
}

/// A function wrapped by [`EnsureCallback::decorate`].
pub struct Decorated<S, A, R = ()> {
    signature: Arc<Signature>,
    callback_name: &'static str,
    callback_args: A,
    target: S,
    _result: PhantomData<fn() -> R>,
}

impl<S, A, R> Decorated<S, A, R>
where
    S: Shape<A, R>,
    A: Clone + 'static,
    R: 'static,
{
    pub fn shape(&self) -> ShapeKind {
        S::KIND
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Calls the wrapped function.
    ///
    /// Whatever the body returns (including an `Err` of its own) or however
    /// it panics is passed through unchanged; the callback's fallback
    /// invocation happens before that.
    ///
    /// For a [`Plain`] body the result is a `Result` that carries the errors
    /// of [`PendingCall::start`]. The lazy shapes return their iterator,
    /// future or stream directly and report those errors as its first item
    /// or its output instead; the body does not run in either case.
    pub fn call(&self, arguments: Arguments) -> S::Output {
        self.target.run(PendingCall {
            signature: Arc::clone(&self.signature),
            callback_name: self.callback_name,
            callback_args: self.callback_args.clone(),
            arguments,
            _result: PhantomData,
        })
    }
}

impl<S, A: fmt::Debug, R> fmt::Debug for Decorated<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorated")
            .field("signature", &self.signature)
            .field("callback_name", &self.callback_name)
            .field("callback_args", &self.callback_args)
            .finish()
    }
}

/// Replaces the bound callback argument with a new token owning it.
///
/// Returns the finalizer that falls back to calling that token.
fn bind_callback<A, R>(
    bound: &mut BoundArguments,
    callback_name: &str,
    callback_args: A,
) -> Result<Finalizer<A, R>, CallbackError>
where
    A: 'static,
    R: 'static,
{
    let value = bound.take_value(callback_name)?;
    let source = match callback_source::<A, R>(value) {
        Ok(source) => source,
        Err(value) => {
            bound.replace(callback_name, value);
            return Err(CallbackError::ArgumentType {
                parameter: callback_name.to_string(),
                expected: std::any::type_name::<Callback<A, R>>(),
            });
        }
    };

    let (token, finalizer) = take_over(source, callback_args)?;
    bound.replace(callback_name, Box::new(token));
    Ok(finalizer)
}

fn callback_source<A: 'static, R: 'static>(value: Value) -> Result<CallbackArg<A, R>, Value> {
    let value = match value.downcast::<Callback<A, R>>() {
        Ok(token) => return Ok(CallbackArg::Owned(*token)),
        Err(value) => value,
    };
    let value = match value.downcast::<CallbackArg<A, R>>() {
        Ok(arg) => return Ok(*arg),
        Err(value) => value,
    };
    value
        .downcast::<BoxedCallback<A, R>>()
        .map(|callable| CallbackArg::Plain(*callable))
}
