//! Cooperative cancellation signal.
//!
//! A [`CancelToken`] is observed by both acquisition paths of the gate's
//! lock: suspended waiters select on [`CancelToken::cancelled`], and blocked
//! threads register the address they park on so [`CancelToken::cancel`] can
//! wake them.

use core::fmt;
use core::pin::pin;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use parking_lot_core::DEFAULT_UNPARK_TOKEN;
use tokio::sync::Notify;

/// Error returned when a wait was abandoned because its token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

struct Inner {
   cancelled: AtomicBool,
   notify: Notify,
   /// Park keys of threads currently blocked while observing this token.
   parked: Mutex<Vec<usize>>,
}

/// A cloneable cancellation signal.
///
/// Clones share the same state: cancelling one cancels all of them.
/// [`CancelToken::none`] produces a token that can never fire and carries
/// no allocation.
#[derive(Clone, Default)]
pub struct CancelToken {
   inner: Option<Arc<Inner>>,
}

impl CancelToken {
   /// Creates a new token that can be cancelled.
   #[must_use]
   pub fn new() -> Self {
      Self {
         inner: Some(Arc::new(Inner {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
            parked: Mutex::new(Vec::new()),
         })),
      }
   }

   /// Returns a token that never fires.
   #[inline]
   #[must_use]
   pub const fn none() -> Self {
      Self { inner: None }
   }

   /// Returns `true` if this token can ever be cancelled.
   #[inline]
   pub fn can_cancel(&self) -> bool {
      self.inner.is_some()
   }

   /// Returns `true` once [`cancel`](Self::cancel) has been called on this
   /// token or any of its clones.
   #[inline]
   pub fn is_cancelled(&self) -> bool {
      self
         .inner
         .as_ref()
         .is_some_and(|inner| inner.cancelled.load(Ordering::Acquire))
   }

   /// Fires the token, waking every task and thread waiting on it.
   ///
   /// Calling this more than once has no further effect. On a token created
   /// with [`none`](Self::none) this does nothing.
   pub fn cancel(&self) {
      let Some(inner) = &self.inner else {
         return;
      };
      if inner.cancelled.swap(true, Ordering::AcqRel) {
         return;
      }
      inner.notify.notify_waiters();

      let parked = inner.parked.lock().unwrap_or_else(PoisonError::into_inner);
      for &key in parked.iter() {
         // SAFETY: `key` is the address a thread in `GateLock::lock` parks on.
         // Unparking an address nobody is parked on is a no-op.
         unsafe {
            parking_lot_core::unpark_all(key, DEFAULT_UNPARK_TOKEN);
         }
      }
   }

   /// Completes once the token is cancelled.
   ///
   /// Never completes for a token created with [`none`](Self::none).
   pub async fn cancelled(&self) {
      let Some(inner) = &self.inner else {
         return core::future::pending().await;
      };
      loop {
         let mut notified = pin!(inner.notify.notified());
         notified.as_mut().enable();
         if inner.cancelled.load(Ordering::Acquire) {
            return;
         }
         notified.await;
      }
   }

   /// Registers a park key that [`cancel`](Self::cancel) must unpark.
   ///
   /// The registration lasts until the returned guard is dropped. It must be
   /// made before the caller's park validation reads [`is_cancelled`](Self::is_cancelled).
   pub(crate) fn register_parked(&self, key: usize) -> ParkRegistration<'_> {
      if let Some(inner) = &self.inner {
         inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key);
      }
      ParkRegistration { token: self, key }
   }
}

impl fmt::Debug for CancelToken {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("CancelToken")
         .field("can_cancel", &self.can_cancel())
         .field("cancelled", &self.is_cancelled())
         .finish()
   }
}

/// Removes a park key from its token on drop.
pub(crate) struct ParkRegistration<'a> {
   token: &'a CancelToken,
   key: usize,
}

impl Drop for ParkRegistration<'_> {
   fn drop(&mut self) {
      let Some(inner) = &self.token.inner else {
         return;
      };
      let mut parked = inner.parked.lock().unwrap_or_else(PoisonError::into_inner);
      if let Some(pos) = parked.iter().position(|&key| key == self.key) {
         parked.swap_remove(pos);
      }
   }
}

#[cfg(test)]
mod tests {
   use std::time::Duration;

   use super::*;

   #[test]
   fn none_never_fires() {
      let token = CancelToken::none();
      assert!(!token.can_cancel());
      token.cancel();
      assert!(!token.is_cancelled());
   }

   #[test]
   fn clones_share_state() {
      let token = CancelToken::new();
      let clone = token.clone();
      assert!(!clone.is_cancelled());
      token.cancel();
      assert!(clone.is_cancelled());
      // Second cancel is a no-op.
      clone.cancel();
      assert!(token.is_cancelled());
   }

   #[test]
   fn registration_is_removed_on_drop() {
      let token = CancelToken::new();
      {
         let _a = token.register_parked(1);
         let _b = token.register_parked(1);
         let inner = token.inner.as_ref().unwrap();
         assert_eq!(inner.parked.lock().unwrap().len(), 2);
      }
      let inner = token.inner.as_ref().unwrap();
      assert!(inner.parked.lock().unwrap().is_empty());
   }

   #[tokio::test]
   async fn cancelled_wakes_waiter() {
      let token = CancelToken::new();
      let waiter = {
         let token = token.clone();
         tokio::spawn(async move { token.cancelled().await })
      };
      tokio::time::sleep(Duration::from_millis(10)).await;
      token.cancel();
      tokio::time::timeout(Duration::from_secs(5), waiter)
         .await
         .expect("waiter was not woken")
         .unwrap();
   }

   #[tokio::test]
   async fn cancelled_returns_immediately_after_cancel() {
      let token = CancelToken::new();
      token.cancel();
      token.cancelled().await;
   }

   #[tokio::test]
   async fn none_is_pending() {
      let token = CancelToken::none();
      let res = tokio::time::timeout(Duration::from_millis(10), token.cancelled()).await;
      assert!(res.is_err());
   }
}
