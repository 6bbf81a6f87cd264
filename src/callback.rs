//! The ownership token that makes a callback exactly-once-callable.
//!
//! A [`Callback`] holds either a live callable or nothing. Two operations can
//! empty it, [`Callback::call`] and [`Callback::release`], and only the first
//! of them across the token's whole lifetime has any effect. Clones of a
//! `Callback` are handles to the same token.
//!
//! # Examples
//!
//! ```
//! use callback_guard::Callback;
//!
//! let callback = Callback::new(|n: i32| n * 2);
//! assert_eq!(callback.call(21), Some(42));
//!
//! // Spent: further calls are no-ops and releasing is an error.
//! assert_eq!(callback.call(1), None);
//! assert!(callback.release().is_err());
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::callback_event::{emit_event, CallbackEvent};
use crate::CallbackError;

/// A callable that has been taken out of its token.
pub type BoxedCallback<A, R = ()> = Box<dyn FnOnce(A) -> R + Send + 'static>;

type Slot<A, R> = Arc<Mutex<Option<BoxedCallback<A, R>>>>;

/// An ownership token around a callback.
///
/// The token is shared between a wrapped call's body and the wrapper that
/// finalizes it. Calling it after it has been consumed does nothing; releasing
/// it after it has been consumed fails with [`CallbackError::AlreadyReleased`].
pub struct Callback<A, R = ()> {
    slot: Slot<A, R>,
}

/// A value that can become the contents of a new [`Callback`].
///
/// Either a raw callable, or an existing token whose ownership moves into the
/// new one.
pub enum CallbackArg<A, R = ()> {
    Plain(BoxedCallback<A, R>),
    Owned(Callback<A, R>),
}

impl<A, R> Callback<A, R> {
    /// Wraps a closure in a fresh token.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(A) -> R + Send + 'static,
    {
        Self::holding(Box::new(f))
    }

    /// Builds a token from `source`, taking over its callable.
    ///
    /// If `source` is already a token it is released and left permanently
    /// empty; the new token becomes the only owner.
    ///
    /// # Errors
    ///
    /// [`CallbackError::AlreadyConsumed`] if `source` is a token that was
    /// already called or released.
    pub fn wrap(source: impl Into<CallbackArg<A, R>>) -> Result<Self, CallbackError> {
        let (callable, transferred) = match source.into() {
            CallbackArg::Plain(callable) => (callable, false),
            CallbackArg::Owned(token) => {
                let callable = token
                    .release()
                    .map_err(|_| CallbackError::AlreadyConsumed)?;
                (callable, true)
            }
        };

        tracing::debug!(transferred, "callback wrapped");
        emit_event(CallbackEvent::Wrap { transferred });
        Ok(Self::holding(callable))
    }

    /// Invokes the callback if this token still owns it.
    ///
    /// Returns `None` without doing anything when the callback was already
    /// called or released, so it is always safe to call.
    pub fn call(&self, args: A) -> Option<R> {
        // The callable leaves the slot before it runs.
        let callable = self.take();
        emit_event(CallbackEvent::Invoke {
            fired: callable.is_some(),
        });
        callable.map(|f| f(args))
    }

    /// Takes the callback out of the token without invoking it.
    ///
    /// # Errors
    ///
    /// [`CallbackError::AlreadyReleased`] if the token is already empty.
    pub fn release(&self) -> Result<BoxedCallback<A, R>, CallbackError> {
        let callable = self.take().ok_or(CallbackError::AlreadyReleased)?;
        emit_event(CallbackEvent::Release);
        Ok(callable)
    }

    /// Whether the token still owns its callback.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    fn holding(callable: BoxedCallback<A, R>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(callable))),
        }
    }

    fn take(&self) -> Option<BoxedCallback<A, R>> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<A, R> CallbackArg<A, R> {
    /// A raw callable that is not yet owned by any token.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(A) -> R + Send + 'static,
    {
        CallbackArg::Plain(Box::new(f))
    }
}

impl<A, R> From<Callback<A, R>> for CallbackArg<A, R> {
    fn from(token: Callback<A, R>) -> Self {
        CallbackArg::Owned(token)
    }
}

impl<A, R> From<&Callback<A, R>> for CallbackArg<A, R> {
    fn from(token: &Callback<A, R>) -> Self {
        CallbackArg::Owned(token.clone())
    }
}

impl<A, R> From<BoxedCallback<A, R>> for CallbackArg<A, R> {
    fn from(callable: BoxedCallback<A, R>) -> Self {
        CallbackArg::Plain(callable)
    }
}

impl<A, R> fmt::Debug for CallbackArg<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackArg::Plain(_) => f.write_str("Plain(..)"),
            CallbackArg::Owned(token) => f.debug_tuple("Owned").field(token).finish(),
        }
    }
}

/// Returns the raw callable behind a possibly wrapped callback.
///
/// Use this before handing a callback to code that is not wrapped itself: a
/// token is released (so no wrapper will fall back to calling it), a raw
/// callable is returned as it is.
///
/// # Errors
///
/// [`CallbackError::AlreadyReleased`] if `value` is a token that is already
/// empty.
///
/// # Examples
///
/// ```
/// use callback_guard::{release_callback, Callback};
///
/// let token = Callback::new(|s: String| s.len());
/// let raw = release_callback(&token).unwrap();
/// assert_eq!(raw("four".to_string()), 4);
/// assert!(!token.is_pending());
/// ```
pub fn release_callback<A, R>(
    value: impl Into<CallbackArg<A, R>>,
) -> Result<BoxedCallback<A, R>, CallbackError> {
    match value.into() {
        CallbackArg::Plain(callable) => Ok(callable),
        CallbackArg::Owned(token) => token.release(),
    }
}
