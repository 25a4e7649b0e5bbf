use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use dataloader::{fan_out, DataLoader, LoadError, Loader};
use futures_util::future::join_all;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
enum TestError {
    #[error("upstream failed for {0}")]
    Upstream(String),
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Default)]
struct Recorder {
    batches: Mutex<Vec<Vec<String>>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl Recorder {
    fn batches(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|batch| {
                let mut batch = batch.clone();
                batch.sort();
                batch
            })
            .collect()
    }

    fn fetches(&self, key: &str) -> usize {
        self.fetches.lock().unwrap().get(key).copied().unwrap_or_default()
    }
}

#[derive(Clone, Default)]
struct TestLoader {
    recorder: Arc<Recorder>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    skipped: HashSet<String>,
}

impl TestLoader {
    fn delayed(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    fn skipping(mut self, key: &str) -> Self {
        self.skipped.insert(key.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Loader<String> for TestLoader {
    type Value = String;
    type Error = TestError;

    async fn load(&self, keys: &[String]) -> HashMap<String, Result<String, TestError>> {
        self.recorder.batches.lock().unwrap().push(keys.to_vec());

        let mut outcomes = fan_out(keys, |key| async move {
            *self.recorder.fetches.lock().unwrap().entry(key.clone()).or_default() += 1;

            if let Some(delay) = self.delays.get(&key) {
                tokio::time::sleep(*delay).await;
            }

            if self.failing.contains(&key) {
                Err(TestError::Upstream(key))
            } else {
                Ok(format!("value-{key}"))
            }
        })
        .await;

        outcomes.retain(|key, _| !self.skipped.contains(key));
        outcomes
    }
}

fn loader(test_loader: TestLoader) -> DataLoader<String, TestLoader> {
    DataLoader::new("test", test_loader)
}

#[tokio::test]
async fn concurrent_loads_of_one_key_share_a_single_fetch() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();
    let loader = loader(test_loader);

    let values: Vec<_> = (0..10).map(|_| loader.load("a".to_string())).collect();
    let outcomes = join_all(values.iter().map(|value| value.get())).await;

    assert_eq!(1, recorder.fetches("a"));
    assert!(outcomes.iter().all(|outcome| *outcome == Ok("value-a".to_string())));
}

#[tokio::test]
async fn keys_requested_together_form_one_batch() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();
    let loader = loader(test_loader);

    let values: Vec<_> = ["c", "a", "b", "a"]
        .into_iter()
        .map(|key| loader.load(key.to_string()))
        .collect();

    join_all(values.iter().map(|value| value.get())).await;

    assert_eq!(vec![vec!["a", "b", "c"]], recorder.batches());
}

#[tokio::test]
async fn a_failed_key_does_not_affect_its_batch_siblings() {
    let test_loader = TestLoader::default().failing("a");
    let loader = loader(test_loader);

    let a = loader.load("a".to_string());
    let b = loader.load("b".to_string());

    assert_eq!(Err(TestError::Upstream("a".to_string())), a.get().await);
    assert_eq!(Ok("value-b".to_string()), b.get().await);
}

#[tokio::test]
async fn outcomes_follow_keys_not_completion_order() {
    let test_loader = TestLoader::default()
        .delayed("first", Duration::from_millis(50))
        .delayed("second", Duration::from_millis(1));
    let loader = loader(test_loader);

    let first = loader.load("first".to_string());
    let second = loader.load("second".to_string());

    let (first, second) = tokio::join!(first.get(), second.get());

    assert_eq!(Ok("value-first".to_string()), first);
    assert_eq!(Ok("value-second".to_string()), second);
}

#[tokio::test]
async fn separate_loaders_never_share_outcomes() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();

    let one = loader(test_loader.clone());
    let other = loader(test_loader);

    assert_eq!(Ok("value-a".to_string()), one.load("a".to_string()).get().await);
    assert_eq!(Ok("value-a".to_string()), other.load("a".to_string()).get().await);

    assert_eq!(2, recorder.fetches("a"));
}

#[tokio::test]
async fn resolved_keys_are_never_fetched_again() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();
    let loader = loader(test_loader);

    let value = loader.load("a".to_string());
    assert_eq!(Ok("value-a".to_string()), value.get().await);
    assert_eq!(Ok("value-a".to_string()), value.get().await);
    assert_eq!(Some(&Ok("value-a".to_string())), value.peek());

    let again = loader.load("a".to_string());
    assert_eq!(Some(&Ok("value-a".to_string())), again.peek());
    assert_eq!(Ok("value-a".to_string()), again.get().await);

    assert_eq!(1, recorder.fetches("a"));
    assert_eq!(1, recorder.batches().len());
}

#[tokio::test]
async fn failures_are_memoized() {
    let test_loader = TestLoader::default().failing("a");
    let recorder = test_loader.recorder.clone();
    let loader = loader(test_loader);

    let first = loader.load("a".to_string()).get().await;
    let second = loader.load("a".to_string()).get().await;

    assert_eq!(Err(TestError::Upstream("a".to_string())), first);
    assert_eq!(first, second);
    assert_eq!(1, recorder.fetches("a"));
}

#[tokio::test]
async fn full_windows_are_dispatched_early() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();
    let loader = loader(test_loader).max_batch_size(2);

    let values: Vec<_> = ["a", "b", "c", "d", "e"]
        .into_iter()
        .map(|key| loader.load(key.to_string()))
        .collect();

    let outcomes = join_all(values.iter().map(|value| value.get())).await;

    assert!(outcomes.iter().all(Result::is_ok));

    let mut sizes: Vec<_> = recorder.batches().iter().map(Vec::len).collect();
    sizes.sort();

    assert_eq!(vec![1, 2, 2], sizes);
}

#[tokio::test]
async fn missing_keys_resolve_to_an_error() {
    let test_loader = TestLoader::default().skipping("a");
    let loader = loader(test_loader);

    assert_eq!(
        Err(TestError::Load(LoadError::MissingValue)),
        loader.load("a".to_string()).get().await
    );
}

#[tokio::test]
async fn zero_delay_still_batches_a_tick() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();
    let loader = loader(test_loader).delay(Duration::ZERO);

    let a = loader.load("a".to_string());
    let b = loader.load("b".to_string());

    let (a, b) = tokio::join!(a.get(), b.get());

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(vec![vec!["a", "b"]], recorder.batches());
}

#[tokio::test]
async fn cancellation_resolves_in_flight_loads() {
    let test_loader = TestLoader::default().delayed("slow", Duration::from_secs(30));
    let cancellation = CancellationToken::new();
    let tracker = TaskTracker::new();

    let loader = loader(test_loader)
        .cancellation(cancellation.clone())
        .tracker(tracker.clone());

    let value = loader.load("slow".to_string());

    tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancellation.cancel();
        }
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), value.get()).await.unwrap();
    assert_eq!(Err(TestError::Load(LoadError::Cancelled)), outcome);

    tracker.close();
    tokio::time::timeout(Duration::from_secs(5), tracker.wait()).await.unwrap();
}

#[tokio::test]
async fn loads_after_cancellation_fail_without_fetching() {
    let test_loader = TestLoader::default();
    let recorder = test_loader.recorder.clone();
    let cancellation = CancellationToken::new();

    let loader = loader(test_loader).cancellation(cancellation.clone());
    cancellation.cancel();

    assert_eq!(
        Err(TestError::Load(LoadError::Cancelled)),
        loader.load("a".to_string()).get().await
    );
    assert_eq!(0, recorder.fetches("a"));
}
