//! The fallback invocation and its attachment to each execution shape.
//!
//! A [`Finalizer`] calls a token with fixed arguments when it is finished or
//! dropped, whichever comes first. Because a token only ever fires once, this
//! is a no-op whenever the body already called, released or handed on the
//! callback. The guarded wrappers tie the takeover of the callback to the
//! point where the wrapped body starts, and the finalizer to the point where
//! it unwinds:
//!
//! | shape      | wrapper           | takeover        | finalization                           |
//! |------------|-------------------|-----------------|----------------------------------------|
//! | function   | [`guard`]         | at the call     | after the body returns or panics       |
//! | iterator   | [`GuardedIter`]   | first `next`    | after exhaustion, on drop, or on panic |
//! | future     | [`GuardedFuture`] | first poll      | after completion, on drop, or on panic |
//! | stream     | [`GuardedStream`] | first poll      | after exhaustion, on drop, or on panic |
//!
//! Until the takeover happens the caller still owns the callback, so an
//! iterator, future or stream dropped before it ever ran calls nothing.

use std::future::Future;
use std::iter::FusedIterator;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_lite::Stream;
use pin_project::pin_project;

use crate::callback::{Callback, CallbackArg};
use crate::callback_event::{emit_event, CallbackEvent};
use crate::CallbackError;

/// Deferred start of a guarded body: takes over the callback, then builds the
/// body's iterator, future or stream.
pub(crate) type Start<T, A, R> =
    Box<dyn FnOnce() -> Result<(T, Finalizer<A, R>), CallbackError> + Send>;

/// Invokes a call's token with the configured arguments exactly once.
///
/// # Examples
///
/// ```
/// use callback_guard::{Callback, Finalizer};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let seen_clone = seen.clone();
/// let token = Callback::new(move |msg: &'static str| seen_clone.lock().unwrap().push(msg));
///
/// {
///     let _finalizer = Finalizer::new(token.clone(), "fallback");
///     token.call("body");
/// }
/// assert_eq!(*seen.lock().unwrap(), ["body"]);
/// ```
pub struct Finalizer<A, R = ()> {
    callback: Callback<A, R>,
    callback_args: Option<A>,
}

impl<A, R> Finalizer<A, R> {
    pub fn new(callback: Callback<A, R>, callback_args: A) -> Self {
        Self {
            callback,
            callback_args: Some(callback_args),
        }
    }

    /// The token this finalizer will fall back to calling.
    pub fn callback(&self) -> &Callback<A, R> {
        &self.callback
    }

    /// Runs the fallback invocation now instead of on drop.
    ///
    /// Returns the callback's result if the fallback actually fired.
    pub fn finish(mut self) -> Option<R> {
        self.fire()
    }

    fn fire(&mut self) -> Option<R> {
        let args = self.callback_args.take()?;
        let result = self.callback.call(args);
        let fired = result.is_some();
        tracing::trace!(fired, "callback finalized");
        emit_event(CallbackEvent::Finalize { fired });
        result
    }
}

impl<A, R> Drop for Finalizer<A, R> {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Builds a token owning `callback` and the finalizer that falls back to it.
pub(crate) fn take_over<A, R>(
    callback: impl Into<CallbackArg<A, R>>,
    callback_args: A,
) -> Result<(Callback<A, R>, Finalizer<A, R>), CallbackError> {
    let token = Callback::wrap(callback)?;
    let finalizer = Finalizer::new(token.clone(), callback_args);
    Ok((token, finalizer))
}

/// Runs `body` with ownership of `callback`, then falls back to calling it.
///
/// A new token is built from `callback` (draining it if it is already a
/// token) and passed to `body`. When `body` returns or panics, the token is
/// called with `callback_args` unless `body` called or released it, or handed
/// it to another owner. The body's result is returned unchanged.
///
/// # Errors
///
/// [`CallbackError::AlreadyConsumed`] if `callback` is a spent token. The body
/// does not run in that case.
///
/// # Examples
///
/// ```
/// use callback_guard::{guard, Callback};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let seen_clone = seen.clone();
/// let callback = Callback::new(move |n: i32| seen_clone.lock().unwrap().push(n));
///
/// let out = guard(callback, 0, |cb| {
///     cb.call(1);
///     "x"
/// })
/// .unwrap();
///
/// assert_eq!(out, "x");
/// assert_eq!(*seen.lock().unwrap(), [1]);
/// ```
pub fn guard<A, R, T>(
    callback: impl Into<CallbackArg<A, R>>,
    callback_args: A,
    body: impl FnOnce(Callback<A, R>) -> T,
) -> Result<T, CallbackError> {
    let (token, finalizer) = take_over(callback, callback_args)?;
    let output = body(token);
    drop(finalizer);
    Ok(output)
}

/// Like [`guard`], for a body that produces an iterator.
///
/// Nothing happens here. The first call to `next` takes over `callback` and
/// runs the body; if `callback` is a spent token by then, that call yields
/// `Err(CallbackError::AlreadyConsumed)` and the iterator ends.
///
/// # Examples
///
/// ```
/// use callback_guard::{guard_iter, Callback, CallbackError};
///
/// let callback = Callback::new(|_: ()| ());
/// let items = guard_iter(&callback, (), |_cb| [1, 2]);
///
/// // The caller still owns the callback until the iterator starts.
/// callback.call(());
/// let items: Vec<_> = items.collect();
/// assert_eq!(items, [Err(CallbackError::AlreadyConsumed)]);
/// ```
pub fn guard_iter<A, R, I>(
    callback: impl Into<CallbackArg<A, R>>,
    callback_args: A,
    body: impl FnOnce(Callback<A, R>) -> I + Send + 'static,
) -> GuardedIter<I::IntoIter, A, R>
where
    I: IntoIterator,
    A: Send + 'static,
    R: 'static,
{
    let callback = callback.into();
    GuardedIter::deferred(Box::new(move || {
        let (token, finalizer) = take_over(callback, callback_args)?;
        Ok((body(token).into_iter(), finalizer))
    }))
}

/// Like [`guard`], for a body that produces a future.
///
/// The first poll takes over `callback` and builds the body's future. A spent
/// token at that point completes the future with
/// `Err(CallbackError::AlreadyConsumed)`.
pub fn guard_future<A, R, Fut>(
    callback: impl Into<CallbackArg<A, R>>,
    callback_args: A,
    body: impl FnOnce(Callback<A, R>) -> Fut + Send + 'static,
) -> GuardedFuture<Fut, A, R>
where
    Fut: Future,
    A: Send + 'static,
    R: 'static,
{
    let callback = callback.into();
    GuardedFuture::deferred(Box::new(move || {
        let (token, finalizer) = take_over(callback, callback_args)?;
        Ok((body(token), finalizer))
    }))
}

/// Like [`guard`], for a body that produces a stream.
///
/// The first poll takes over `callback` and runs the body. A spent token at
/// that point yields a single `Err(CallbackError::AlreadyConsumed)`.
pub fn guard_stream<A, R, St>(
    callback: impl Into<CallbackArg<A, R>>,
    callback_args: A,
    body: impl FnOnce(Callback<A, R>) -> St + Send + 'static,
) -> GuardedStream<St, A, R>
where
    St: Stream,
    A: Send + 'static,
    R: 'static,
{
    let callback = callback.into();
    GuardedStream::deferred(Box::new(move || {
        let (token, finalizer) = take_over(callback, callback_args)?;
        Ok((body(token), finalizer))
    }))
}

/// Iterator returned by a wrapped sequence-producing body.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct GuardedIter<I, A, R = ()> {
    start: Option<Start<I, A, R>>,
    inner: Option<I>,
    finalizer: Option<Finalizer<A, R>>,
}

impl<I, A, R> GuardedIter<I, A, R> {
    pub(crate) fn deferred(start: Start<I, A, R>) -> Self {
        Self {
            start: Some(start),
            inner: None,
            finalizer: None,
        }
    }

    /// Whether the body has started.
    pub fn is_started(&self) -> bool {
        self.start.is_none()
    }

    /// Whether the wrapped sequence has ended and been finalized.
    pub fn is_finished(&self) -> bool {
        self.start.is_none() && self.inner.is_none()
    }
}

impl<I: Iterator, A, R> Iterator for GuardedIter<I, A, R> {
    type Item = Result<I::Item, CallbackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(start) = self.start.take() {
            match start() {
                Ok((inner, finalizer)) => {
                    self.inner = Some(inner);
                    self.finalizer = Some(finalizer);
                }
                Err(e) => return Some(Err(e)),
            }
        }

        let item = self.inner.as_mut()?.next();
        if item.is_none() {
            // Unwind the body before the fallback runs.
            self.inner = None;
            if let Some(finalizer) = self.finalizer.take() {
                finalizer.finish();
            }
        }
        item.map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match (&self.inner, &self.start) {
            (Some(inner), _) => inner.size_hint(),
            (None, Some(_)) => (0, None),
            (None, None) => (0, Some(0)),
        }
    }
}

impl<I: Iterator, A, R> FusedIterator for GuardedIter<I, A, R> {}

/// Future returned by a wrapped asynchronous body.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct GuardedFuture<Fut, A, R = ()> {
    start: Option<Start<Fut, A, R>>,
    #[pin]
    inner: Option<Fut>,
    finalizer: Option<Finalizer<A, R>>,
}

impl<Fut, A, R> GuardedFuture<Fut, A, R> {
    pub(crate) fn deferred(start: Start<Fut, A, R>) -> Self {
        Self {
            start: Some(start),
            inner: None,
            finalizer: None,
        }
    }

    /// Whether the future has been polled.
    pub fn is_started(&self) -> bool {
        self.start.is_none()
    }
}

impl<Fut: Future, A, R> Future for GuardedFuture<Fut, A, R> {
    type Output = Result<Fut::Output, CallbackError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        if let Some(start) = this.start.take() {
            match start() {
                Ok((inner, finalizer)) => {
                    this.inner.set(Some(inner));
                    *this.finalizer = Some(finalizer);
                }
                Err(e) => return Poll::Ready(Err(e)),
            }
        }

        let Some(inner) = this.inner.as_mut().as_pin_mut() else {
            panic!("GuardedFuture polled after completion");
        };

        match inner.poll(cx) {
            Poll::Ready(output) => {
                this.inner.set(None);
                if let Some(finalizer) = this.finalizer.take() {
                    finalizer.finish();
                }
                Poll::Ready(Ok(output))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Stream returned by a wrapped asynchronous sequence-producing body.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct GuardedStream<St, A, R = ()> {
    start: Option<Start<St, A, R>>,
    #[pin]
    inner: Option<St>,
    finalizer: Option<Finalizer<A, R>>,
}

impl<St, A, R> GuardedStream<St, A, R> {
    pub(crate) fn deferred(start: Start<St, A, R>) -> Self {
        Self {
            start: Some(start),
            inner: None,
            finalizer: None,
        }
    }

    /// Whether the stream has been polled.
    pub fn is_started(&self) -> bool {
        self.start.is_none()
    }

    /// Whether the wrapped stream has ended and been finalized.
    pub fn is_finished(&self) -> bool {
        self.start.is_none() && self.inner.is_none()
    }
}

impl<St: Stream, A, R> Stream for GuardedStream<St, A, R> {
    type Item = Result<St::Item, CallbackError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if let Some(start) = this.start.take() {
            match start() {
                Ok((inner, finalizer)) => {
                    this.inner.set(Some(inner));
                    *this.finalizer = Some(finalizer);
                }
                Err(e) => return Poll::Ready(Some(Err(e))),
            }
        }

        let Some(inner) = this.inner.as_mut().as_pin_mut() else {
            return Poll::Ready(None);
        };

        match inner.poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(None) => {
                this.inner.set(None);
                if let Some(finalizer) = this.finalizer.take() {
                    finalizer.finish();
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match (&self.inner, &self.start) {
            (Some(inner), _) => inner.size_hint(),
            (None, Some(_)) => (0, None),
            (None, None) => (0, Some(0)),
        }
    }
}
