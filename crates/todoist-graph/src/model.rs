use async_graphql::{ComplexObject, Context, SimpleObject};

use crate::{
    resolvers,
    schema::{resolve, resolve_tasks},
};

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
#[graphql(complex)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[ComplexObject]
impl Project {
    async fn tasks(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<Task>>> {
        resolve_tasks(ctx, |scope| resolvers::project_tasks(scope, self)).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
#[graphql(complex)]
pub struct Task {
    pub id: String,
    pub content: String,
    #[graphql(skip)]
    pub project_id: String,
}

#[ComplexObject]
impl Task {
    async fn project(&self, ctx: &Context<'_>) -> async_graphql::Result<Project> {
        resolve(ctx, |scope| resolvers::task_project(scope, self)).await
    }
}

impl From<todoist_client::Project> for Project {
    fn from(project: todoist_client::Project) -> Self {
        Project {
            id: project.id,
            name: project.name,
        }
    }
}

impl From<todoist_client::Task> for Task {
    fn from(task: todoist_client::Task) -> Self {
        Task {
            id: task.id,
            content: task.content,
            project_id: task.project_id,
        }
    }
}
