//! Batching and caching of keyed loads for the lifetime of one request.
//!
//! A [`DataLoader`] hands out a [`DeferredValue`] for every key it is asked
//! for. Keys requested during the same scheduling tick are collected into a
//! window and passed to the [`Loader`] in one call, and the outcome of every key
//! is memoized, failures included, until the loader is dropped.

mod deferred;
mod error;
mod fan_out;

use std::{
    collections::HashMap,
    hash::Hash,
    mem,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio_util::{sync::CancellationToken, task::TaskTracker};

pub use deferred::{deferred, Completer, DeferredValue};
pub use error::LoadError;
pub use fan_out::fan_out;

const DEFAULT_DELAY: Duration = Duration::from_millis(1);

/// The batch function behind a [`DataLoader`].
#[async_trait::async_trait]
pub trait Loader<K>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
{
    type Value: Clone + Send + Sync + 'static;
    type Error: Clone + From<LoadError> + Send + Sync + 'static;

    /// Loads every key of one window. `keys` never contains duplicates. Keys
    /// left out of the returned map resolve to [`LoadError::MissingValue`].
    async fn load(&self, keys: &[K]) -> HashMap<K, Result<Self::Value, Self::Error>>;
}

type Outcome<L, K> = DeferredValue<<L as Loader<K>>::Value, <L as Loader<K>>::Error>;
type Pending<L, K> = (K, Completer<<L as Loader<K>>::Value, <L as Loader<K>>::Error>);

struct Window<L: Loader<K>, K: Send + Sync + 'static> {
    id: u64,
    pending: Vec<Pending<L, K>>,
}

impl<L: Loader<K>, K: Send + Sync + 'static> Window<L, K> {
    /// Closes the current window and opens the next one.
    fn take(&mut self) -> Vec<Pending<L, K>> {
        self.id += 1;
        mem::take(&mut self.pending)
    }
}

struct State<L: Loader<K>, K: Send + Sync + 'static> {
    cache: HashMap<K, Outcome<L, K>>,
    window: Window<L, K>,
}

struct Inner<L: Loader<K>, K: Send + Sync + 'static> {
    name: &'static str,
    loader: L,
    state: Mutex<State<L, K>>,
}

/// Coalesces and memoizes loads of `K` through the loader `L`.
///
/// Cloning is cheap and every clone shares the same cache. Loading spawns
/// tasks, so it has to happen inside a Tokio runtime.
pub struct DataLoader<K, L>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
{
    inner: Arc<Inner<L, K>>,
    delay: Duration,
    max_batch_size: usize,
    cancellation: CancellationToken,
    tracker: TaskTracker,
}

impl<K, L> Clone for DataLoader<K, L>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            delay: self.delay,
            max_batch_size: self.max_batch_size,
            cancellation: self.cancellation.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<K, L> DataLoader<K, L>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    L: Loader<K>,
{
    pub fn new(name: &'static str, loader: L) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                loader,
                state: Mutex::new(State {
                    cache: HashMap::new(),
                    window: Window {
                        id: 0,
                        pending: Vec::new(),
                    },
                }),
            }),
            delay: DEFAULT_DELAY,
            max_batch_size: usize::MAX,
            cancellation: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// How long a window stays open after its first key. Zero dispatches
    /// after a single cooperative yield.
    pub fn delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// A window reaching this many keys is dispatched right away.
    pub fn max_batch_size(self, max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            ..self
        }
    }

    /// Pending and future loads fail with [`LoadError::Cancelled`] once the
    /// token fires, and in-flight batches are dropped.
    pub fn cancellation(self, cancellation: CancellationToken) -> Self {
        Self { cancellation, ..self }
    }

    /// Every task spawned by the loader is registered with this tracker.
    pub fn tracker(self, tracker: TaskTracker) -> Self {
        Self { tracker, ..self }
    }

    /// Returns the value for `key`, scheduling a fetch if this is the first
    /// time the key is requested.
    ///
    /// Never waits: the returned value is awaited separately.
    pub fn load(&self, key: K) -> DeferredValue<L::Value, L::Error> {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(value) = state.cache.get(&key) {
            return value.clone();
        }

        let (completer, value) = deferred();
        state.cache.insert(key.clone(), value.clone());

        if self.cancellation.is_cancelled() {
            completer.complete(Err(LoadError::Cancelled.into()));
            return value;
        }

        state.window.pending.push((key, completer));

        if state.window.pending.len() >= self.max_batch_size {
            let batch = state.window.take();
            drop(state);

            self.tracker
                .spawn(dispatch(self.inner.clone(), batch, self.cancellation.clone()));
        } else if state.window.pending.len() == 1 {
            let window_id = state.window.id;
            drop(state);

            self.schedule(window_id);
        }

        value
    }

    fn schedule(&self, window_id: u64) {
        let inner = self.inner.clone();
        let delay = self.delay;
        let cancellation = self.cancellation.clone();

        self.tracker.spawn(async move {
            let wait = async {
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
            };

            tokio::select! {
                _ = wait => {}
                _ = cancellation.cancelled() => {}
            }

            let batch = {
                let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);

                // The window already went out because it filled up.
                if state.window.id != window_id {
                    return;
                }

                state.window.take()
            };

            dispatch(inner, batch, cancellation).await;
        });
    }
}

async fn dispatch<K, L>(inner: Arc<Inner<L, K>>, batch: Vec<Pending<L, K>>, cancellation: CancellationToken)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    L: Loader<K>,
{
    if batch.is_empty() {
        return;
    }

    let keys: Vec<K> = batch.iter().map(|(key, _)| key.clone()).collect();
    tracing::debug!(loader = inner.name, batch_size = keys.len(), "dispatching batch");

    let outcomes = tokio::select! {
        biased;
        _ = cancellation.cancelled() => None,
        outcomes = inner.loader.load(&keys) => Some(outcomes),
    };

    let Some(mut outcomes) = outcomes else {
        tracing::debug!(loader = inner.name, batch_size = keys.len(), "batch cancelled");

        for (_, completer) in batch {
            completer.complete(Err(LoadError::Cancelled.into()));
        }

        return;
    };

    for (key, completer) in batch {
        let outcome = outcomes
            .remove(&key)
            .unwrap_or_else(|| Err(LoadError::MissingValue.into()));

        completer.complete(outcome);
    }
}
