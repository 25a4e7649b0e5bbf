use dataloader::{DeferredValue, LoadError};
use tokio::sync::oneshot;

use crate::{RequestScope, ResolveError};

/// What a field resolver hands back to the engine.
///
/// Either the outcome is already known, or it arrives later through a
/// [`Later`] handle. The engine treats both the same way through
/// [`Resolution::collect`].
#[derive(Debug)]
pub enum Resolution<T> {
    Immediate(Result<T, ResolveError>),
    Deferred(Later<T>),
}

/// The receiving end of a deferred field value. Collecting consumes it, so the
/// value is delivered exactly once.
#[derive(Debug)]
pub struct Later<T> {
    receiver: oneshot::Receiver<Result<T, ResolveError>>,
}

impl<T> Resolution<T>
where
    T: Send + 'static,
{
    /// Adapts a loader value into a resolution, applying `map` once the value
    /// arrives.
    ///
    /// An already resolved value is mapped in place. Otherwise a task is
    /// spawned in the scope to wait for it and pass the outcome through a
    /// single-slot channel, so the caller never blocks here.
    pub fn defer<V, F>(scope: &RequestScope, value: DeferredValue<V, ResolveError>, map: F) -> Self
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce(V) -> Result<T, ResolveError> + Send + 'static,
    {
        if let Some(outcome) = value.peek() {
            return Resolution::Immediate(outcome.clone().and_then(map));
        }

        let (sender, receiver) = oneshot::channel();

        scope.tracker().spawn(async move {
            let outcome = value.get().await.and_then(map);
            // The engine may have given up on the field already.
            sender.send(outcome).ok();
        });

        Resolution::Deferred(Later { receiver })
    }

    pub async fn collect(self) -> Result<T, ResolveError> {
        match self {
            Resolution::Immediate(outcome) => outcome,
            Resolution::Deferred(later) => later.collect().await,
        }
    }
}

impl<T> Later<T> {
    pub async fn collect(self) -> Result<T, ResolveError> {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(ResolveError::Load(LoadError::Cancelled)))
    }
}
