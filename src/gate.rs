//! Unparameterized gate.
//!
//! This module provides [`Gate<E>`], which runs a routine taking no input at
//! most once to success. The routine is bound at construction in one of four
//! shapes (plain, cancellable, async, async cancellable), all normalized to
//! [`Routine<(), E>`].

use core::fmt;
use core::future::Future;

use crate::cancel::CancelToken;
use crate::error::GateError;
use crate::raw::RawGate;
use crate::routine::{self, Routine};

/// A disposable gate that runs its routine exactly once.
///
/// Callers may use the blocking [`init`](Self::init) and the suspending
/// [`init_async`](Self::init_async) interchangeably and concurrently; they
/// serialize on the same lock and agree on a single outcome.
pub struct Gate<E> {
   raw: RawGate<(), E>,
}

impl<E> Gate<E> {
   /// Creates a gate from a plain procedure.
   pub fn new<F>(f: F) -> Self
   where
      F: Fn() -> Result<(), E> + Send + Sync + 'static,
      E: Send + 'static,
   {
      Self::with_routine(routine::from_fn(move |()| f()))
   }

   /// Creates a gate from a procedure that observes the caller's cancellation token.
   pub fn with_cancel<F>(f: F) -> Self
   where
      F: Fn(&CancelToken) -> Result<(), E> + Send + Sync + 'static,
      E: Send + 'static,
   {
      Self::with_routine(routine::from_fn_cancel(move |(), token: &CancelToken| f(token)))
   }

   /// Creates a gate from an async operation.
   pub fn new_async<F, Fut>(f: F) -> Self
   where
      F: Fn() -> Fut + Send + Sync + 'static,
      Fut: Future<Output = Result<(), E>> + Send + 'static,
      E: 'static,
   {
      Self::with_routine(routine::from_async(move |()| f()))
   }

   /// Creates a gate from an async operation that observes the caller's
   /// cancellation token.
   pub fn with_cancel_async<F, Fut>(f: F) -> Self
   where
      F: Fn(CancelToken) -> Fut + Send + Sync + 'static,
      Fut: Future<Output = Result<(), E>> + Send + 'static,
      E: 'static,
   {
      Self::with_routine(routine::from_async_cancel(move |(), token| f(token)))
   }

   /// Creates a gate from an already-normalized routine.
   ///
   /// # Errors
   ///
   /// Returns [`GateError::InvalidArgument`] if `routine` is `None`.
   pub fn from_routine(routine: Option<Routine<(), E>>) -> Result<Self, GateError<E>> {
      match routine {
         Some(routine) => Ok(Self::with_routine(routine)),
         None => Err(GateError::InvalidArgument("routine must be provided")),
      }
   }

   #[inline]
   fn with_routine(routine: Routine<(), E>) -> Self {
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

   /// Runs the routine if it has not yet succeeded, blocking the current thread.
   ///
   /// # Errors
   ///
   /// - [`GateError::Disposed`] if disposal has begun.
   /// - [`GateError::Init`] if the routine ran in this call and failed.
   #[inline]
   pub fn init(&self) -> Result<(), GateError<E>> {
      self.raw.init((), &CancelToken::none())
   }

   /// Like [`init`](Self::init), abandoning the wait for the lock if `token` fires.
   ///
   /// # Errors
   ///
   /// As [`init`](Self::init), plus [`GateError::Cancelled`].
   #[inline]
   pub fn init_cancellable(&self, token: &CancelToken) -> Result<(), GateError<E>> {
      self.raw.init((), token)
   }

   /// Runs the routine if it has not yet succeeded, suspending the current task.
   ///
   /// # Errors
   ///
   /// - [`GateError::Disposed`] if disposal has begun.
   /// - [`GateError::Init`] if the routine ran in this call and failed.
   #[inline]
   pub async fn init_async(&self) -> Result<(), GateError<E>> {
      self.raw.init_async((), &CancelToken::none()).await
   }

   /// Like [`init_async`](Self::init_async), abandoning the wait for the lock
   /// if `token` fires.
   ///
   /// # Errors
   ///
   /// As [`init_async`](Self::init_async), plus [`GateError::Cancelled`].
   #[inline]
   pub async fn init_async_cancellable(&self, token: &CancelToken) -> Result<(), GateError<E>> {
      self.raw.init_async((), token).await
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

impl<E> fmt::Debug for Gate<E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("Gate");
      self.raw.fmt_fields(&mut d);
      d.finish_non_exhaustive()
   }
}
