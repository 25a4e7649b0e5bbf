//! Serves the Todoist GraphQL schema over HTTP.

mod error;
mod server;

pub mod config;

pub use error::Error;
pub use server::{router, serve, ServeConfig, ServerState};

pub type Result<T> = std::result::Result<T, Error>;
