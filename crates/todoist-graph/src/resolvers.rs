//! The field resolvers. Each one turns its field into a loader key and returns
//! without waiting for the value.

use crate::{Project, RequestScope, Resolution, ResolveError, Task};

/// The key under which every project, or every task, is cached.
pub const ALL: &str = "";

/// `Query.projects`
pub fn projects(scope: &RequestScope) -> Resolution<Vec<Project>> {
    let value = scope.projects().load(ALL.to_string());

    Resolution::defer(scope, value, |projects| Ok(projects.to_vec()))
}

/// `Query.tasks`, with an empty project id meaning every task.
pub fn tasks(scope: &RequestScope, project_id: &str) -> Resolution<Vec<Task>> {
    let value = scope.tasks().load(project_id.to_string());

    Resolution::defer(scope, value, |tasks| Ok(tasks.to_vec()))
}

/// `Project.tasks`
pub fn project_tasks(scope: &RequestScope, project: &Project) -> Resolution<Vec<Task>> {
    tasks(scope, &project.id)
}

/// `Task.project`
///
/// Loaded through the projects loader under the task's project id, then
/// picked out of the collection by id.
pub fn task_project(scope: &RequestScope, task: &Task) -> Resolution<Project> {
    let project_id = task.project_id.clone();
    let value = scope.projects().load(project_id.clone());

    Resolution::defer(scope, value, move |projects| {
        projects
            .iter()
            .find(|project| project.id == project_id)
            .cloned()
            .ok_or(ResolveError::ProjectNotFound(project_id))
    })
}
