//! The canonical initializer shape and the adapters that produce it.

use core::future::Future;

use futures::future::{self, BoxFuture, FutureExt};

use crate::cancel::CancelToken;

/// The canonical initializer: takes the caller-supplied value and the
/// caller's cancellation token, and returns a future of the outcome.
///
/// The routine may be called again after a failed attempt, so it is `Fn`.
/// Synchronous shapes run inside the call and return an already-completed
/// future.
pub type Routine<P, E> =
   Box<dyn Fn(P, CancelToken) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

/// Wraps a plain procedure.
pub(crate) fn from_fn<P, E, F>(f: F) -> Routine<P, E>
where
   F: Fn(P) -> Result<(), E> + Send + Sync + 'static,
   P: 'static,
   E: Send + 'static,
{
   Box::new(move |param: P, _: CancelToken| future::ready(f(param)).boxed())
}

/// Wraps a procedure that observes cancellation.
pub(crate) fn from_fn_cancel<P, E, F>(f: F) -> Routine<P, E>
where
   F: Fn(P, &CancelToken) -> Result<(), E> + Send + Sync + 'static,
   P: 'static,
   E: Send + 'static,
{
   Box::new(move |param: P, token: CancelToken| future::ready(f(param, &token)).boxed())
}

/// Wraps a suspending operation that ignores cancellation.
pub(crate) fn from_async<P, E, F, Fut>(f: F) -> Routine<P, E>
where
   F: Fn(P) -> Fut + Send + Sync + 'static,
   Fut: Future<Output = Result<(), E>> + Send + 'static,
   P: 'static,
   E: 'static,
{
   Box::new(move |param: P, _: CancelToken| f(param).boxed())
}

/// Wraps a suspending operation that observes cancellation.
pub(crate) fn from_async_cancel<P, E, F, Fut>(f: F) -> Routine<P, E>
where
   F: Fn(P, CancelToken) -> Fut + Send + Sync + 'static,
   Fut: Future<Output = Result<(), E>> + Send + 'static,
   P: 'static,
   E: 'static,
{
   Box::new(move |param: P, token: CancelToken| f(param, token).boxed())
}
