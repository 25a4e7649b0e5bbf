//! The GraphQL surface over Todoist projects and tasks.
//!
//! Every query runs against its own [`RequestScope`]. Resolvers go through the
//! scope's loaders, so a response tree asking for the project of many tasks
//! costs one upstream call per distinct project id instead of one per task.

mod error;
mod loaders;
mod model;
mod resolution;
pub mod resolvers;
mod schema;
mod scope;

pub use error::ResolveError;
pub use loaders::{ProjectsLoader, TasksLoader};
pub use model::{Project, Task};
pub use resolution::{Later, Resolution};
pub use schema::{build as build_schema, Query, TodoistSchema};
pub use scope::{BatchOptions, RequestScope};

/// Executes one request against its own, freshly created scope.
pub async fn execute(
    schema: &TodoistSchema,
    scope: RequestScope,
    request: impl Into<async_graphql::Request>,
) -> async_graphql::Response {
    schema.execute(request.into().data(scope)).await
}
