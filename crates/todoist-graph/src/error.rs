use async_graphql::ErrorExtensions;
use dataloader::LoadError;
use todoist_client::FetchError;

/// Why a field could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("get projects: {0}")]
    Projects(FetchError),
    #[error("get tasks: {0}")]
    Tasks(FetchError),
    #[error("project {0} not found")]
    ProjectNotFound(String),
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl ResolveError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Load(LoadError::Cancelled))
    }

    /// The `code` extension attached to the GraphQL error.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::Projects(FetchError::Decode(_)) | ResolveError::Tasks(FetchError::Decode(_)) => {
                "DECODE_ERROR"
            }
            ResolveError::Projects(_) | ResolveError::Tasks(_) => "UPSTREAM_ERROR",
            ResolveError::ProjectNotFound(_) => "NOT_FOUND",
            ResolveError::Load(LoadError::Cancelled) => "CANCELLED",
            ResolveError::Load(LoadError::MissingValue) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for ResolveError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, extensions| extensions.set("code", self.code()))
    }
}
