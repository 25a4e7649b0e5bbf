//! A small client for the parts of the Todoist REST API the gateway reads.

mod error;
mod types;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

pub use error::{FetchError, FetchResult};
pub use types::{Project, Task};

pub const DEFAULT_BASE_URL: &str = "https://api.todoist.com/rest";

/// The upstream operations the graph layer depends on.
#[async_trait::async_trait]
pub trait TodoistApi: Send + Sync {
    async fn fetch_projects(&self) -> FetchResult<Vec<Project>>;

    /// Tasks of one project, or every task when `project_id` is empty.
    async fn fetch_tasks(&self, project_id: &str) -> FetchResult<Vec<Task>>;
}

#[derive(Clone)]
pub struct TodoistClient {
    /// The HTTP client used for making requests.
    http_client: reqwest::Client,

    /// Root of the REST API, without the version segment.
    base_url: Url,

    /// Personal API token sent as a bearer token.
    token: SecretString,
}

impl TodoistClient {
    pub fn new(http_client: reqwest::Client, base_url: Url, token: SecretString) -> Self {
        Self {
            http_client,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn projects(&self) -> FetchResult<Vec<Project>> {
        tracing::debug!("fetching projects");
        self.get(&["v2", "projects"], &[]).await
    }

    pub async fn project(&self, project_id: &str) -> FetchResult<Project> {
        tracing::debug!(project_id, "fetching project");
        self.get(&["v2", "projects", project_id], &[]).await
    }

    pub async fn tasks(&self, project_id: &str) -> FetchResult<Vec<Task>> {
        tracing::debug!(project_id, "fetching tasks");

        if project_id.is_empty() {
            self.get(&["v2", "tasks"], &[]).await
        } else {
            self.get(&["v2", "tasks"], &[("project_id", project_id)]).await
        }
    }

    pub async fn task(&self, task_id: &str) -> FetchResult<Task> {
        tracing::debug!(task_id, "fetching task");
        self.get(&["v2", "tasks", task_id], &[]).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> FetchResult<T> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);

        let response = self
            .http_client
            .get(url)
            .query(query)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .inspect_err(|err| tracing::warn!("Error while calling Todoist: {err}"))?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(unexpected_status(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

fn unexpected_status(status: StatusCode, body: &[u8]) -> FetchError {
    FetchError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

#[async_trait::async_trait]
impl TodoistApi for TodoistClient {
    async fn fetch_projects(&self) -> FetchResult<Vec<Project>> {
        self.projects().await
    }

    async fn fetch_tasks(&self, project_id: &str) -> FetchResult<Vec<Task>> {
        self.tasks(project_id).await
    }
}
