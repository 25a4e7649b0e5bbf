use std::fmt;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::LoadError;

/// A single-assignment value that becomes available later.
///
/// Every clone observes the same outcome, and reading it does not consume it.
/// If the [`Completer`] is dropped without completing, readers observe
/// [`LoadError::Cancelled`].
pub struct DeferredValue<V, E> {
    inner: Shared<BoxFuture<'static, Result<V, E>>>,
}

/// The write half of a [`DeferredValue`]. Completing consumes it, so a value
/// is assigned at most once.
pub struct Completer<V, E> {
    sender: oneshot::Sender<Result<V, E>>,
}

/// Creates a pending [`DeferredValue`] together with the handle that resolves it.
pub fn deferred<V, E>() -> (Completer<V, E>, DeferredValue<V, E>)
where
    V: Clone + Send + Sync + 'static,
    E: Clone + From<LoadError> + Send + Sync + 'static,
{
    let (sender, receiver) = oneshot::channel();

    let inner = async move {
        receiver
            .await
            .unwrap_or_else(|_| Err(E::from(LoadError::Cancelled)))
    }
    .boxed()
    .shared();

    (Completer { sender }, DeferredValue { inner })
}

impl<V, E> DeferredValue<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// A value which is resolved from the start.
    pub fn ready(outcome: Result<V, E>) -> Self {
        Self {
            inner: futures_util::future::ready(outcome).boxed().shared(),
        }
    }

    /// Waits for the outcome. Can be called any number of times, from any
    /// number of tasks.
    pub async fn get(&self) -> Result<V, E> {
        self.inner.clone().await
    }

    /// The outcome, if it has already been observed by a reader.
    pub fn peek(&self) -> Option<&Result<V, E>> {
        self.inner.peek()
    }
}

impl<V, E> Clone for DeferredValue<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V, E> fmt::Debug for DeferredValue<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredValue").finish_non_exhaustive()
    }
}

impl<V, E> Completer<V, E> {
    pub fn complete(self, outcome: Result<V, E>) {
        // Nobody is waiting anymore when every reader has been dropped.
        self.sender.send(outcome).ok();
    }
}
