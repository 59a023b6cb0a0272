//! The gate state machine shared by [`Gate`](crate::Gate) and
//! [`ParamGate`](crate::ParamGate).
//!
//! Both entry points run the same two transitions under the lock:
//! [`RawGate::begin`] re-validates the flags and starts the routine, and
//! [`RawGate::finish`] publishes a successful outcome. The blocking and
//! suspending adapters differ only in how they acquire the lock and wait on
//! the routine's future.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use futures::future::{BoxFuture, FutureExt};

use crate::cancel::CancelToken;
use crate::error::GateError;
use crate::routine::Routine;
use crate::state::{GateGuard, GateLock};

type InitFuture<E> = BoxFuture<'static, Result<(), E>>;

pub(crate) struct RawGate<P, E> {
   initialized: AtomicBool,
   disposed: AtomicBool,
   lock: GateLock,
   /// Only accessed while `lock` is held.
   routine: UnsafeCell<Option<Routine<P, E>>>,
}

impl<P, E> RawGate<P, E> {
   pub(crate) fn new(routine: Routine<P, E>) -> Self {
      Self {
         initialized: AtomicBool::new(false),
         disposed: AtomicBool::new(false),
         lock: GateLock::new(),
         routine: UnsafeCell::new(Some(routine)),
      }
   }

   #[inline]
   pub(crate) fn is_initialized(&self) -> bool {
      // Acquire pairs with the Release store in `finish`, so a caller that sees
      // `true` also sees everything the routine did.
      self.initialized.load(Ordering::Acquire)
   }

   #[inline]
   pub(crate) fn is_disposed(&self) -> bool {
      // Monotonic flag; a stale `false` is caught again under the lock.
      self.disposed.load(Ordering::Acquire)
   }

   /// Lock-free check shared by both entry points.
   ///
   /// Returns `None` when the slow path must be taken.
   #[inline(always)]
   fn fast_path(&self) -> Option<Result<(), GateError<E>>> {
      if self.is_disposed() {
         return Some(Err(GateError::Disposed));
      }
      if self.is_initialized() {
         return Some(Ok(()));
      }
      None
   }

   /// Re-validates state under the lock and starts the routine.
   ///
   /// Returns `Ok(None)` if another caller already initialized the gate.
   fn begin(
      &self,
      _guard: &GateGuard<'_>,
      param: P,
      token: &CancelToken,
   ) -> Result<Option<InitFuture<E>>, GateError<E>> {
      // Both flags may have changed while we waited for the lock. Disposal is
      // checked first so an earlier success never outranks it.
      if self.is_disposed() {
         return Err(GateError::Disposed);
      }
      if self.is_initialized() {
         crate::gate_log!(trace, "gate already initialized by another caller");
         return Ok(None);
      }
      // SAFETY: The guard proves we hold the lock, the only context in which
      // the routine slot is accessed.
      let routine = unsafe { &*self.routine.get() };
      let Some(routine) = routine.as_ref() else {
         return Err(GateError::NoInitializer);
      };
      Ok(Some(routine(param, token.clone())))
   }

   /// Publishes the routine's outcome under the lock.
   fn finish(&self, _guard: &GateGuard<'_>, result: Result<(), E>) -> Result<(), GateError<E>> {
      if let Err(err) = result {
         crate::gate_log!(debug, "gate initializer failed; gate remains uninitialized");
         return Err(GateError::Init(err));
      }
      // Disposal began while the routine ran; the outcome must not be published.
      if self.is_disposed() {
         return Err(GateError::Disposed);
      }

      // Release ordering publishes the routine's effects to every reader that
      // observes the flag.
      self.initialized.store(true, Ordering::Release);
      // SAFETY: We hold the lock.
      let routine = unsafe { (*self.routine.get()).take() };
      drop(routine);
      crate::gate_log!(debug, "gate initialized");
      Ok(())
   }

   /// Drops the routine and resets the initialized flag under the lock.
   fn teardown(&self, _guard: &GateGuard<'_>) {
      // SAFETY: We hold the lock.
      let routine = unsafe { (*self.routine.get()).take() };
      drop(routine);
      // `disposed` is already set, so no reader acts on this flag alone.
      self.initialized.store(false, Ordering::Release);
      crate::gate_log!(debug, "gate disposed");
   }

   /// Blocking entry point.
   #[inline]
   pub(crate) fn init(&self, param: P, token: &CancelToken) -> Result<(), GateError<E>> {
      match self.fast_path() {
         Some(result) => result,
         None => self.init_slow(param, token),
      }
   }

   #[cold]
   fn init_slow(&self, param: P, token: &CancelToken) -> Result<(), GateError<E>> {
      crate::gate_log!(trace, "gate slow path (blocking)");
      let guard = self.lock.lock(token)?;
      let Some(mut fut) = self.begin(&guard, param, token)? else {
         return Ok(());
      };
      // A routine that completes without suspending needs no blocking at all.
      let result = match (&mut fut).now_or_never() {
         Some(result) => result,
         None => block_on_routine(fut),
      };
      self.finish(&guard, result)
   }

   /// Suspending entry point.
   #[inline]
   pub(crate) async fn init_async(&self, param: P, token: &CancelToken) -> Result<(), GateError<E>> {
      match self.fast_path() {
         Some(result) => result,
         None => self.init_async_slow(param, token).await,
      }
   }

   #[cold]
   async fn init_async_slow(&self, param: P, token: &CancelToken) -> Result<(), GateError<E>> {
      crate::gate_log!(trace, "gate slow path (async)");
      let guard = self.lock.lock_async(token).await?;
      let Some(fut) = self.begin(&guard, param, token)? else {
         return Ok(());
      };
      let result = fut.await;
      self.finish(&guard, result)
   }

   pub(crate) fn dispose(&self) {
      // AcqRel: the winner's later lock acquisition must not be reordered
      // before the flag flip that closes the gate to new attempts.
      if self
         .disposed
         .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
         .is_err()
      {
         return;
      }
      let guard = self.lock.lock_uncancellable();
      self.teardown(&guard);
   }

   pub(crate) async fn dispose_async(&self) {
      // Same ordering as `dispose`.
      if self
         .disposed
         .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
         .is_err()
      {
         return;
      }
      let guard = self.lock.lock_async_uncancellable().await;
      self.teardown(&guard);
   }

   pub(crate) fn fmt_fields(&self, d: &mut fmt::DebugStruct<'_, '_>) {
      d.field("initialized", &self.is_initialized())
         .field("disposed", &self.is_disposed())
         .field("locked", &self.lock.is_locked());
   }
}

/// Blocks the current thread on a routine that suspended.
///
/// On a multi-thread tokio runtime the wait is moved off the worker with
/// `block_in_place` and driven by the runtime's handle, so tokio timers and IO
/// work inside the routine. Everywhere else `futures`' executor is used; a
/// routine that needs tokio drivers must then be called where a runtime
/// context is entered.
fn block_on_routine<E>(fut: InitFuture<E>) -> Result<(), E> {
   #[cfg(feature = "tokio-runtime")]
   let fut = match tokio::runtime::Handle::try_current() {
      Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
         return tokio::task::block_in_place(|| handle.block_on(fut));
      }
      _ => fut,
   };
   futures::executor::block_on(fut)
}

// SAFETY:
// The routine slot is only touched while the lock is held, and the routine
// itself is `Send + Sync`. Neither `P` nor `E` values are stored; they only
// pass through calls, which carry their own bounds.
unsafe impl<P, E> Sync for RawGate<P, E> {}
