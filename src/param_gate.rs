//! Gate with a caller-supplied routine input.
//!
//! [`ParamGate<P, E>`] behaves exactly like [`Gate<E>`](crate::Gate), except
//! every `init` call carries a value of type `P`. The value is handed to the
//! routine only if that call is the one that executes it; callers that find
//! the gate already initialized (or lose the race under the lock) drop their
//! value unused.

use core::fmt;
use core::future::Future;

use crate::cancel::CancelToken;
use crate::error::GateError;
use crate::raw::RawGate;
use crate::routine::{self, Routine};

/// A disposable gate whose routine receives a value from the caller that runs it.
pub struct ParamGate<P, E> {
   raw: RawGate<P, E>,
}

impl<P: 'static, E> ParamGate<P, E> {
   /// Creates a gate from a plain procedure.
   pub fn new<F>(f: F) -> Self
   where
      F: Fn(P) -> Result<(), E> + Send + Sync + 'static,
      E: Send + 'static,
   {
      Self::with_routine(routine::from_fn(f))
   }

   /// Creates a gate from a procedure that observes the caller's cancellation token.
   pub fn with_cancel<F>(f: F) -> Self
   where
      F: Fn(P, &CancelToken) -> Result<(), E> + Send + Sync + 'static,
      E: Send + 'static,
   {
      Self::with_routine(routine::from_fn_cancel(f))
   }

   /// Creates a gate from an async operation.
   pub fn new_async<F, Fut>(f: F) -> Self
   where
      F: Fn(P) -> Fut + Send + Sync + 'static,
      Fut: Future<Output = Result<(), E>> + Send + 'static,
      E: 'static,
   {
      Self::with_routine(routine::from_async(f))
   }

   /// Creates a gate from an async operation that observes the caller's
   /// cancellation token.
   pub fn with_cancel_async<F, Fut>(f: F) -> Self
   where
      F: Fn(P, CancelToken) -> Fut + Send + Sync + 'static,
      Fut: Future<Output = Result<(), E>> + Send + 'static,
      E: 'static,
   {
      Self::with_routine(routine::from_async_cancel(f))
   }
}

impl<P, E> ParamGate<P, E> {
   /// Creates a gate from an already-normalized routine.
   ///
   /// # Errors
   ///
   /// Returns [`GateError::InvalidArgument`] if `routine` is `None`.
   pub fn from_routine(routine: Option<Routine<P, E>>) -> Result<Self, GateError<E>> {
      let Some(routine) = routine else {
         return Err(GateError::InvalidArgument("routine must be provided"));
      };
      Ok(Self::with_routine(routine))
   }

   #[inline]
   fn with_routine(routine: Routine<P, E>) -> Self {
      Self {
         raw: RawGate::new(routine),
      }
   }

   /// Returns `true` once the routine has completed successfully.
   ///
   /// Reads `false` after disposal. This method never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.raw.is_initialized()
   }

   /// Returns `true` once disposal has begun.
   #[inline]
   pub fn is_disposed(&self) -> bool {
      self.raw.is_disposed()
   }

   /// Runs the routine with `param` if it has not yet succeeded, blocking the
   /// current thread.
   ///
   /// # Errors
   ///
   /// - [`GateError::Disposed`] if disposal has begun.
   /// - [`GateError::Init`] if the routine ran in this call and failed.
   #[inline]
   pub fn init(&self, param: P) -> Result<(), GateError<E>> {
      self.raw.init(param, &CancelToken::none())
   }

   /// Like [`init`](Self::init), abandoning the wait for the lock if `token` fires.
   ///
   /// # Errors
   ///
   /// As [`init`](Self::init), plus [`GateError::Cancelled`].
   #[inline]
   pub fn init_cancellable(&self, param: P, token: &CancelToken) -> Result<(), GateError<E>> {
      self.raw.init(param, token)
   }

   /// Runs the routine with `param` if it has not yet succeeded, suspending
   /// the current task.
   ///
   /// # Errors
   ///
   /// - [`GateError::Disposed`] if disposal has begun.
   /// - [`GateError::Init`] if the routine ran in this call and failed.
   #[inline]
   pub async fn init_async(&self, param: P) -> Result<(), GateError<E>> {
      self.raw.init_async(param, &CancelToken::none()).await
   }

   /// Like [`init_async`](Self::init_async), abandoning the wait for the lock
   /// if `token` fires.
   ///
   /// # Errors
   ///
   /// As [`init_async`](Self::init_async), plus [`GateError::Cancelled`].
   #[inline]
   pub async fn init_async_cancellable(
      &self,
      param: P,
      token: &CancelToken,
   ) -> Result<(), GateError<E>> {
      self.raw.init_async(param, token).await
   }

   /// Closes the gate and drops the routine, blocking while an attempt is in flight.
   ///
   /// Idempotent; never fails.
   pub fn dispose(&self) {
      self.raw.dispose();
   }

   /// Closes the gate and drops the routine, suspending while an attempt is in flight.
   ///
   /// Idempotent; never fails.
   pub async fn dispose_async(&self) {
      self.raw.dispose_async().await;
   }
}

impl<P, E> fmt::Debug for ParamGate<P, E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("ParamGate");
      self.raw.fmt_fields(&mut d);
      d.finish_non_exhaustive()
   }
}
