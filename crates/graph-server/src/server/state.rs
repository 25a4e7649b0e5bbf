use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use todoist_client::TodoistApi;
use todoist_graph::{BatchOptions, TodoistSchema};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

struct ServerStateInner {
    schema: TodoistSchema,
    client: Arc<dyn TodoistApi>,
    batching: BatchOptions,
    graphiql: Option<String>,
    shutdown: CancellationToken,
}

/// Shared by every request handled by the server.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

impl ServerState {
    /// Cancelling `shutdown` cancels the scope of every request in flight.
    pub fn new(config: &Config, client: Arc<dyn TodoistApi>, shutdown: CancellationToken) -> Self {
        let graphiql = config
            .graph
            .playground
            .then(|| GraphiQLSource::build().endpoint(&config.graph.path).finish());

        Self {
            inner: Arc::new(ServerStateInner {
                schema: todoist_graph::build_schema(config.graph.introspection),
                client,
                batching: config.batching.options(),
                graphiql,
                shutdown,
            }),
        }
    }

    pub(crate) fn schema(&self) -> &TodoistSchema {
        &self.inner.schema
    }

    pub(crate) fn client(&self) -> &Arc<dyn TodoistApi> {
        &self.inner.client
    }

    pub(crate) fn batching(&self) -> BatchOptions {
        self.inner.batching
    }

    pub(crate) fn graphiql(&self) -> Option<&str> {
        self.inner.graphiql.as_deref()
    }

    pub(crate) fn shutdown(&self) -> &CancellationToken {
        &self.inner.shutdown
    }
}
