use std::{sync::Arc, time::Duration};

use dataloader::{DataLoader, Loader};
use todoist_client::TodoistApi;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::loaders::{ProjectsLoader, TasksLoader};

/// How the loaders of a scope group their keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// How long a window collects keys before it is dispatched.
    pub delay: Duration,
    /// Dispatch a window early once it holds this many keys.
    pub max_batch_size: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1),
            max_batch_size: None,
        }
    }
}

/// Everything one inbound query resolves against: a loader per entity type,
/// sharing one cancellation token and task tracker. Never shared between
/// queries.
///
/// Dropping the scope cancels whatever work it still has in flight.
pub struct RequestScope {
    projects: DataLoader<String, ProjectsLoader>,
    tasks: DataLoader<String, TasksLoader>,
    cancellation: CancellationToken,
    tracker: TaskTracker,
}

impl RequestScope {
    pub fn new(client: Arc<dyn TodoistApi>, options: BatchOptions) -> Self {
        Self::with_cancellation(client, options, &CancellationToken::new())
    }

    /// A scope which is also cancelled when `parent` is.
    pub fn with_cancellation(client: Arc<dyn TodoistApi>, options: BatchOptions, parent: &CancellationToken) -> Self {
        let cancellation = parent.child_token();
        let tracker = TaskTracker::new();

        let projects = configure(
            DataLoader::new("projects", ProjectsLoader::new(client.clone())),
            options,
            &cancellation,
            &tracker,
        );

        let tasks = configure(
            DataLoader::new("tasks", TasksLoader::new(client)),
            options,
            &cancellation,
            &tracker,
        );

        Self {
            projects,
            tasks,
            cancellation,
            tracker,
        }
    }

    pub fn projects(&self) -> &DataLoader<String, ProjectsLoader> {
        &self.projects
    }

    pub fn tasks(&self) -> &DataLoader<String, TasksLoader> {
        &self.tasks
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Stops accepting work and waits until every task spawned for this
    /// scope has finished.
    pub async fn close(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn configure<L: Loader<String>>(
    loader: DataLoader<String, L>,
    options: BatchOptions,
    cancellation: &CancellationToken,
    tracker: &TaskTracker,
) -> DataLoader<String, L> {
    let loader = loader
        .delay(options.delay)
        .cancellation(cancellation.clone())
        .tracker(tracker.clone());

    match options.max_batch_size {
        Some(max_batch_size) => loader.max_batch_size(max_batch_size),
        None => loader,
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
