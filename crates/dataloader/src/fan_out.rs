use std::{collections::HashMap, future::Future, hash::Hash};

use futures_util::future::join_all;

/// Runs `fetch` for every key concurrently and collects the outcomes by key.
///
/// All fetches are joined before returning, so the map is either complete or
/// the whole call was dropped.
pub async fn fan_out<K, V, E, F, Fut>(keys: &[K], fetch: F) -> HashMap<K, Result<V, E>>
where
    K: Eq + Hash + Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    let fetches = keys.iter().map(|key| {
        let fetch = fetch(key.clone());
        let key = key.clone();

        async move { (key, fetch.await) }
    });

    join_all(fetches).await.into_iter().collect()
}
