//! The gate's exclusive lock.
//!
//! The lock state is packed into a single `AtomicU8`:
//! - Bit 0: LOCKED - The lock is held
//! - Bit 1: WAITING - At least one thread or task is waiting
//! - Bits 2-7: EPOCH - Generation counter bumped on every release
//!
//! Blocked threads park on the address of the atomic via `parking_lot_core`;
//! suspended tasks wait on a `tokio::sync::Notify`. A release wakes both kinds
//! of waiter, and whichever wins the next compare-and-set takes the lock.
//! Acquisition order is not FIFO.

use core::pin::pin;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use tokio::sync::Notify;

use crate::cancel::{CancelToken, Cancelled};

/// Exclusive lock acquirable by blocking or by suspending.
pub(crate) struct GateLock {
   state: AtomicU8,
   notify: Notify,
}

impl GateLock {
   /// Bit flag: The lock is held.
   const LOCKED: u8 = 1;
   /// Bit flag: At least one waiter needs to be woken on release.
   const WAITING: u8 = 2;
   /// Start of epoch bits.
   const EPOCH_1: u8 = 4;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates a new, unlocked lock.
   pub(crate) fn new() -> Self {
      Self {
         state: AtomicU8::new(0),
         notify: Notify::new(),
      }
   }

   /// Address blocked threads park on.
   #[inline(always)]
   fn key(&self) -> usize {
      self.state.as_ptr() as usize
   }

   /// Returns `true` if the lock is currently held.
   #[inline]
   pub(crate) fn is_locked(&self) -> bool {
      self.state.load(Ordering::Relaxed) & Self::LOCKED != 0
   }

   /// Tries to take the lock, flagging WAITING if it is held.
   ///
   /// Returns `Err(state)` with the observed state if the lock is held.
   #[inline]
   fn lock_step(&self) -> Result<GateGuard<'_>, u8> {
      loop {
         // Relaxed is enough for the snapshot; the CAS below carries the ordering.
         let current_state = self.state.load(Ordering::Relaxed);

         // Lock is free: try to take it. The epoch is left untouched.
         if current_state & Self::LOCKED == 0 {
            match self.state.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire, // Pairs with the Release swap in `release`
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(GateGuard { lock: self }),
               Err(_) => {
                  // Lost a race or failed spuriously; re-read and retry.
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         // Lock is held. Make sure the holder knows to wake someone on release.
         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.state.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed, // WAITING publishes no data of its own
               Ordering::Relaxed,
            ) {
               // Return the state we wait on, WAITING included.
               Ok(_) => return Err(new_state),
               Err(_) => {
                  // State moved (possibly released); start over.
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         // Held and WAITING already flagged by someone else.
         return Err(current_state);
      }
   }

   /// Parks the current thread until the state moves away from `expected`
   /// or `token` fires.
   #[inline]
   fn wait(&self, expected_state: u8, token: &CancelToken) {
      // SAFETY: The key is the address of our own atomic, which outlives the
      // park call. The validate closure does not call into parking_lot.
      unsafe {
         // Spurious wakeups are fine; callers re-check the state.
         let _ = parking_lot_core::park(
            self.key(),
            || self.state.load(Ordering::Acquire) == expected_state && !token.is_cancelled(),
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Acquires the lock, blocking the current thread while it is held.
   ///
   /// Fails with [`Cancelled`] if `token` has fired on entry or fires while
   /// waiting.
   pub(crate) fn lock(&self, token: &CancelToken) -> Result<GateGuard<'_>, Cancelled> {
      if token.is_cancelled() {
         return Err(Cancelled);
      }
      let mut observed = match self.lock_step() {
         Ok(guard) => return Ok(guard),
         Err(state) => state,
      };

      let _registration = token.register_parked(self.key());
      loop {
         self.wait(observed, token);
         if token.is_cancelled() {
            return Err(Cancelled);
         }
         match self.lock_step() {
            Ok(guard) => return Ok(guard),
            Err(state) => observed = state,
         }
      }
   }

   /// Acquires the lock, blocking without any way to abandon the wait.
   pub(crate) fn lock_uncancellable(&self) -> GateGuard<'_> {
      let never = CancelToken::none();
      loop {
         match self.lock_step() {
            Ok(guard) => return guard,
            // Spurious wakeups land back in `lock_step`.
            Err(observed) => self.wait(observed, &never),
         }
      }
   }

   /// Acquires the lock, suspending the current task while it is held.
   ///
   /// Fails with [`Cancelled`] if `token` has fired on entry or fires while
   /// waiting. Dropping the future abandons the wait.
   pub(crate) async fn lock_async(&self, token: &CancelToken) -> Result<GateGuard<'_>, Cancelled> {
      if token.is_cancelled() {
         return Err(Cancelled);
      }
      loop {
         // Enabled before the attempt so a release racing with it is not missed.
         let mut notified = pin!(self.notify.notified());
         notified.as_mut().enable();

         if let Ok(guard) = self.lock_step() {
            return Ok(guard);
         }

         tokio::select! {
            biased;
            () = token.cancelled() => return Err(Cancelled),
            () = notified => {}
         }
      }
   }

   /// Acquires the lock, suspending without any way to abandon the wait.
   pub(crate) async fn lock_async_uncancellable(&self) -> GateGuard<'_> {
      loop {
         let mut notified = pin!(self.notify.notified());
         notified.as_mut().enable();

         if let Ok(guard) = self.lock_step() {
            return guard;
         }
         notified.await;
      }
   }

   /// Clears LOCKED, bumps the epoch and wakes waiters if any were flagged.
   #[inline]
   fn release(&self) {
      // Only the holder clears LOCKED, so a Relaxed read to compute the next
      // epoch is safe; concurrent writers can only add WAITING, which the swap
      // below still reports through `prev_state`.
      let current_state = self.state.load(Ordering::Relaxed);
      let new_state = Self::next_epoch(current_state);

      // Release ordering publishes everything done under the lock to the
      // next acquirer.
      let prev_state = self.state.swap(new_state, Ordering::Release);

      // Nobody flagged WAITING, so nobody is parked or suspended on us.
      if prev_state & Self::WAITING != 0 {
         // SAFETY: Same key as used in `wait`.
         unsafe {
            parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
         }
         self.notify.notify_waiters();
      }
   }
}

/// RAII guard for a held [`GateLock`]. Releases the lock exactly once on drop.
pub(crate) struct GateGuard<'a> {
   lock: &'a GateLock,
}

impl Drop for GateGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.lock.release();
   }
}
