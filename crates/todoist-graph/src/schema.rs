use async_graphql::{Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, PathSegment, Schema};
use futures_util::future::join_all;

use crate::{resolvers, Project, RequestScope, Resolution, ResolveError, Task};

pub type TodoistSchema = Schema<Query, EmptyMutation, EmptySubscription>;

pub struct Query;

#[Object]
impl Query {
    async fn projects(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<Project>>> {
        resolve_nullable(ctx, resolvers::projects).await
    }

    async fn tasks(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "projectID", default_with = "Some(String::new())")] project_id: Option<String>,
    ) -> async_graphql::Result<Option<Vec<Task>>> {
        let project_id = project_id.unwrap_or_default();

        resolve_tasks(ctx, |scope| resolvers::tasks(scope, &project_id)).await
    }
}

/// Builds the schema. Every execution must carry its own [`RequestScope`] in
/// the request data.
pub fn build(introspection: bool) -> TodoistSchema {
    let builder = Schema::build(Query, EmptyMutation, EmptySubscription);

    if introspection {
        builder.finish()
    } else {
        builder.disable_introspection().finish()
    }
}

/// Runs a resolver against the scope of the current request and collects its
/// value. Failures propagate to the nearest nullable ancestor.
pub(crate) async fn resolve<T>(
    ctx: &Context<'_>,
    resolver: impl FnOnce(&RequestScope) -> Resolution<T>,
) -> async_graphql::Result<T>
where
    T: Send + 'static,
{
    let scope = ctx.data::<RequestScope>()?;

    resolver(scope).collect().await.map_err(|error| error.extend())
}

/// Resolves a nullable field. A failure is reported at the field's own path
/// and the field becomes null, leaving its siblings untouched.
pub(crate) async fn resolve_nullable<T>(
    ctx: &Context<'_>,
    resolver: impl FnOnce(&RequestScope) -> Resolution<T>,
) -> async_graphql::Result<Option<T>>
where
    T: Send + 'static,
{
    let scope = ctx.data::<RequestScope>()?;

    match resolver(scope).collect().await {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            report(ctx, &error, []);
            Ok(None)
        }
    }
}

/// Resolves a nullable list of tasks.
///
/// `Task.project` is non-null, so a task whose project cannot be resolved
/// nulls the whole list. The projects of the listed tasks are loaded here,
/// in one batch, and a failure is reported under each selected `project` key.
/// The per-task fields then read the memoized outcome.
pub(crate) async fn resolve_tasks(
    ctx: &Context<'_>,
    resolver: impl FnOnce(&RequestScope) -> Resolution<Vec<Task>>,
) -> async_graphql::Result<Option<Vec<Task>>> {
    let scope = ctx.data::<RequestScope>()?;

    let Some(tasks) = resolve_nullable(ctx, resolver).await? else {
        return Ok(None);
    };

    let project_keys: Vec<&str> = ctx
        .field()
        .selection_set()
        .filter(|field| field.name() == "project")
        .map(|field| field.alias().unwrap_or(field.name()))
        .collect();

    if project_keys.is_empty() {
        return Ok(Some(tasks));
    }

    let parents = join_all(
        tasks
            .iter()
            .map(|task| resolvers::task_project(scope, task).collect()),
    )
    .await;

    let mut complete = true;

    for (index, parent) in parents.into_iter().enumerate() {
        let Err(error) = parent else { continue };
        complete = false;

        for key in &project_keys {
            report(ctx, &error, [PathSegment::Index(index), PathSegment::Field(key.to_string())]);
        }
    }

    Ok(complete.then_some(tasks))
}

/// Adds `error` to the response at the current field's path, extended with
/// `suffix`.
fn report<const N: usize>(ctx: &Context<'_>, error: &ResolveError, suffix: [PathSegment; N]) {
    let mut error = ctx.set_error_path(error.extend().into_server_error(ctx.item.pos));
    error.path.extend(suffix);

    ctx.add_error(error);
}
