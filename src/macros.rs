//! Compile-time decoration of plain and `async` functions.

/// Wraps a function so that its callback parameter fires exactly once.
///
/// The first line names the callback parameter and the fallback arguments.
/// The callback parameter must be declared as [`Callback<A, R>`](crate::Callback).
/// The generated function has the same parameters and returns
/// `Result<T, CallbackError>`, where `T` is the declared return type: the
/// error is [`CallbackError::AlreadyConsumed`](crate::CallbackError) when a
/// spent callback is passed in, and the body never runs in that case.
///
/// The parameter list is passed through unchanged, so `mut` bindings,
/// patterns and a `self` receiver all work, and the macro can be invoked
/// inside an `impl` block. Inside the body the callback parameter is a new,
/// immutable binding holding the call's own token. Generic parameters and
/// `where` clauses are not supported.
///
/// Naming a parameter that does not exist fails to compile.
///
/// # Examples
///
/// ```rust
/// use callback_guard::{ensure_callback, Callback};
/// use std::sync::{Arc, Mutex};
///
/// ensure_callback! {
///     callback = cb, args = "decorator b";
///     fn function_b(cb: Callback<&'static str>) {}
/// }
///
/// ensure_callback! {
///     callback = callme, args = "decorator a";
///     fn function_a(callme: Callback<&'static str>) {
///         function_b(callme).unwrap();
///     }
/// }
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let seen_clone = seen.clone();
/// function_a(Callback::new(move |from| seen_clone.lock().unwrap().push(from))).unwrap();
///
/// // The innermost wrapper that still owned the callback called it.
/// assert_eq!(*seen.lock().unwrap(), ["decorator b"]);
/// ```
///
/// `async fn` works the same way. The callback is taken over when the
/// returned future is first polled, and the fallback runs when it completes
/// or is dropped.
///
/// ```rust
/// use callback_guard::{ensure_callback, Callback};
///
/// ensure_callback! {
///     callback = done, args = 0;
///     async fn compute(done: Callback<i32>, x: i32) -> i32 {
///         x * 2
///     }
/// }
///
/// let out = futures_lite::future::block_on(compute(Callback::new(|_| ()), 21));
/// assert_eq!(out, Ok(42));
/// ```
///
/// Methods:
///
/// ```rust
/// use callback_guard::{ensure_callback, Callback};
///
/// struct Greeter {
///     name: &'static str,
/// }
///
/// impl Greeter {
///     ensure_callback! {
///         callback = cb, args = "nobody";
///         fn greet(&self, cb: Callback<&'static str, String>, mut times: u8) -> u8 {
///             while times > 1 {
///                 times -= 1;
///             }
///             cb.call(self.name);
///             times
///         }
///     }
/// }
///
/// let greeter = Greeter { name: "ferris" };
/// let callback = Callback::new(|name: &'static str| format!("hello {name}"));
/// assert_eq!(greeter.greet(callback, 3), Ok(1));
/// ```
#[macro_export]
macro_rules! ensure_callback {
    (
        callback = $cb:ident, args = $args:expr;
        $(#[$meta:meta])*
        $vis:vis fn $name:ident $params:tt -> $ret:ty $body:block
    ) => {
        $(#[$meta])*
        $vis fn $name $params -> ::core::result::Result<$ret, $crate::CallbackError> {
            $crate::guard($cb, $args, move |$cb| -> $ret { $body })
        }
    };

    (
        callback = $cb:ident, args = $args:expr;
        $(#[$meta:meta])*
        $vis:vis fn $name:ident $params:tt $body:block
    ) => {
        $crate::ensure_callback! {
            callback = $cb, args = $args;
            $(#[$meta])*
            $vis fn $name $params -> () $body
        }
    };

    (
        callback = $cb:ident, args = $args:expr;
        $(#[$meta:meta])*
        $vis:vis async fn $name:ident $params:tt -> $ret:ty $body:block
    ) => {
        $(#[$meta])*
        $vis async fn $name $params -> ::core::result::Result<$ret, $crate::CallbackError> {
            let $cb = $crate::Callback::wrap($cb)?;
            let finalizer = $crate::Finalizer::new($cb.clone(), $args);
            let output = async move { $body }.await;
            ::core::mem::drop(finalizer);
            ::core::result::Result::Ok(output)
        }
    };

    (
        callback = $cb:ident, args = $args:expr;
        $(#[$meta:meta])*
        $vis:vis async fn $name:ident $params:tt $body:block
    ) => {
        $crate::ensure_callback! {
            callback = $cb, args = $args;
            $(#[$meta])*
            $vis async fn $name $params -> () $body
        }
    };
}
