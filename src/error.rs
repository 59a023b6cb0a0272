//! Errors surfaced by gate operations.

use crate::cancel::Cancelled;

/// An error returned when constructing or initializing a gate.
///
/// `E` is the error type of the gate's initializer routine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError<E> {
   /// A constructor argument was rejected.
   #[error("invalid argument: {0}")]
   InvalidArgument(&'static str),
   /// Disposal of the gate has begun.
   #[error("gate has been disposed")]
   Disposed,
   /// The caller's cancellation token fired while it was waiting.
   #[error(transparent)]
   Cancelled(#[from] Cancelled),
   /// The gate holds no initializer although it is not initialized.
   #[error("no initializer configured")]
   NoInitializer,
   /// The initializer routine itself failed. The gate stays uninitialized.
   #[error("initializer failed: {0}")]
   Init(#[source] E),
}

impl<E> GateError<E> {
   /// Returns `true` for [`GateError::Disposed`].
   #[inline]
   pub fn is_disposed(&self) -> bool {
      matches!(self, Self::Disposed)
   }

   /// Returns `true` for [`GateError::Cancelled`].
   #[inline]
   pub fn is_cancelled(&self) -> bool {
      matches!(self, Self::Cancelled(_))
   }

   /// Returns the routine's error if this is [`GateError::Init`].
   pub fn into_init(self) -> Option<E> {
      match self {
         Self::Init(err) => Some(err),
         _ => None,
      }
   }
}
