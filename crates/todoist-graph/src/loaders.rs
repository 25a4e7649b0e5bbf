use std::{collections::HashMap, sync::Arc};

use dataloader::{fan_out, Loader};
use todoist_client::TodoistApi;

use crate::{Project, ResolveError, Task};

/// Loads the whole project collection. The key only picks the cache slot;
/// every key fetches the same unfiltered list.
pub struct ProjectsLoader {
    client: Arc<dyn TodoistApi>,
}

impl ProjectsLoader {
    pub fn new(client: Arc<dyn TodoistApi>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Loader<String> for ProjectsLoader {
    type Value = Arc<Vec<Project>>;
    type Error = ResolveError;

    async fn load(&self, keys: &[String]) -> HashMap<String, Result<Self::Value, Self::Error>> {
        fan_out(keys, |key| async move {
            self.client
                .fetch_projects()
                .await
                .inspect_err(|err| tracing::warn!(%key, "Error while loading projects: {err}"))
                .map(|projects| Arc::new(projects.into_iter().map(Project::from).collect::<Vec<_>>()))
                .map_err(ResolveError::Projects)
        })
        .await
    }
}

/// Loads tasks by project id, the empty key meaning every task.
pub struct TasksLoader {
    client: Arc<dyn TodoistApi>,
}

impl TasksLoader {
    pub fn new(client: Arc<dyn TodoistApi>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Loader<String> for TasksLoader {
    type Value = Arc<Vec<Task>>;
    type Error = ResolveError;

    async fn load(&self, keys: &[String]) -> HashMap<String, Result<Self::Value, Self::Error>> {
        fan_out(keys, |project_id| async move {
            self.client
                .fetch_tasks(&project_id)
                .await
                .inspect_err(|err| tracing::warn!(%project_id, "Error while loading tasks: {err}"))
                .map(|tasks| Arc::new(tasks.into_iter().map(Task::from).collect::<Vec<_>>()))
                .map_err(ResolveError::Tasks)
        })
        .await
    }
}
