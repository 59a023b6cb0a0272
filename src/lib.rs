//! A disposable gate that runs an initializer exactly once.
//!
//! This crate provides two gate types sharing one state machine:
//!
//! - [`Gate<E>`]: Runs a routine taking no input.
//! - [`ParamGate<P, E>`]: Runs a routine that receives a value supplied by the
//!   caller whose attempt executes it.
//!
//! Any number of threads and tasks may call `init` (blocking) or `init_async`
//! (suspending) concurrently. The routine executes once to success; every
//! caller returns after that single execution. A failed attempt leaves the gate
//! uninitialized so a later call may retry. Disposal permanently closes the
//! gate and drops the routine.
//!
//! # Features
//!
//! - **Lock-free fast path**: Once initialized, `init` touches two atomics only.
//! - **Blocking and async callers**: Both wait on the same lock and observe the
//!   same transitions.
//! - **Cooperative cancellation**: A [`CancelToken`] abandons a caller's own wait
//!   without disturbing other callers.
//! - **Bounded captures**: The routine is dropped after its successful run or on
//!   disposal, releasing anything it captured.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use once_gate::Gate;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let gate = Gate::new({
//!    let runs = Arc::clone(&runs);
//!    move || {
//!       runs.fetch_add(1, Ordering::SeqCst);
//!       Ok::<_, std::io::Error>(())
//!    }
//! });
//!
//! gate.init().unwrap();
//! gate.init().unwrap();
//! assert!(gate.is_initialized());
//! assert_eq!(runs.load(Ordering::SeqCst), 1);
//!
//! gate.dispose();
//! assert!(gate.init().unwrap_err().is_disposed());
//! ```
//!
//! # Blocking callers
//!
//! `init` blocks the calling thread while the lock is contended and while the
//! routine's future is pending. On a multi-thread tokio runtime thread (with
//! the `tokio-runtime` feature) a pending routine is driven by that runtime, so
//! tokio timers and IO work. Do not call it from a thread the routine needs to
//! make progress, such as the only worker of a current-thread runtime.

/// Forwards to the `log` facade when the `log` feature is enabled.
macro_rules! gate_log {
   ($level:ident, $($arg:tt)+) => {
      #[cfg(feature = "log")]
      ::log::$level!(target: "once_gate", $($arg)+);
   };
}
pub(crate) use gate_log;

/// Cancellation signal.
mod cancel;

/// Error taxonomy.
mod error;

/// Unparameterized gate.
mod gate;

/// Gate whose routine receives a caller-supplied value.
mod param_gate;

/// Shared state machine.
mod raw;

/// Canonical initializer shape.
mod routine;

/// Internal lock.
mod state;

pub use cancel::{CancelToken, Cancelled};
pub use error::GateError;
pub use gate::Gate;
pub use param_gate::ParamGate;
pub use routine::Routine;
