//! Events emitted while callbacks change hands.
//!
//! Every token operation reports a [`CallbackEvent`] to an optional
//! process-wide hook and to `tracing` at `trace` level.

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};

/// Events emitted by callback tokens and finalizers.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
///
/// # Examples
///
/// ```rust
/// use callback_guard::CallbackEvent;
///
/// let event = CallbackEvent::Finalize { fired: true };
/// assert_eq!(event.to_string(), "finalize { fired: true }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// A token was constructed.
    Wrap {
        /// Whether ownership moved out of another token.
        transferred: bool,
    },

    /// A token was asked to invoke its callback.
    Invoke {
        /// Whether the callback actually ran.
        fired: bool,
    },

    /// A callback was released out of its token, including when a new
    /// token takes it over (followed by `Wrap { transferred: true }`).
    Release,

    /// A wrapped call reached its finalization step.
    Finalize {
        /// Whether the fallback invocation ran.
        fired: bool,
    },
}

impl fmt::Display for CallbackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackEvent::Wrap { transferred } => {
                write!(f, "wrap {{ transferred: {transferred} }}")
            }
            CallbackEvent::Invoke { fired } => write!(f, "invoke {{ fired: {fired} }}"),
            CallbackEvent::Release => write!(f, "release"),
            CallbackEvent::Finalize { fired } => write!(f, "finalize {{ fired: {fired} }}"),
        }
    }
}

/// Type alias for the user-supplied tracing callback.
pub type TraceCallback = dyn Fn(&CallbackEvent) + Send + Sync + 'static;

static TRACE_CALLBACK: LazyLock<Mutex<Option<Arc<TraceCallback>>>> =
    LazyLock::new(|| Mutex::new(None));

/// Sets a tracing callback that will be invoked on every token operation.
///
/// The hook is process-wide. It reports what happened and must not be used to
/// steer control flow.
///
/// # Example
/// ```rust
/// use callback_guard::{clear_trace_callback, set_trace_callback};
///
/// set_trace_callback(|event| println!("[callback-trace] {event}"));
/// clear_trace_callback();
/// ```
pub fn set_trace_callback(callback: impl Fn(&CallbackEvent) + Send + Sync + 'static) {
    let mut guard = TRACE_CALLBACK.lock().unwrap_or_else(|p| p.into_inner());
    *guard = Some(Arc::new(callback));
}

/// Clears the tracing callback.
pub fn clear_trace_callback() {
    let mut guard = TRACE_CALLBACK.lock().unwrap_or_else(|p| p.into_inner());
    *guard = None;
}

pub(crate) fn emit_event(event: CallbackEvent) {
    tracing::trace!(%event, "callback event");

    // Clone the hook out so it runs without the lock held.
    let hook = TRACE_CALLBACK.lock().unwrap_or_else(|p| p.into_inner()).clone();
    if let Some(callback) = hook {
        callback(&event);
    }
}
