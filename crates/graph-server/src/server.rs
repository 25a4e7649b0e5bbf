mod state;

pub use state::ServerState;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_graphql_axum::{rejection::GraphQLRejection, GraphQLRequest, GraphQLResponse};
use axum::{
    extract::{FromRequest, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use http::{header, HeaderMap, Method};
use secrecy::SecretString;
use todoist_client::TodoistClient;
use todoist_graph::RequestScope;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::config::Config;

/// How long requests in flight may keep running once shutdown starts.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Start parameter for the gateway.
pub struct ServeConfig {
    /// The GraphQL endpoint listen address.
    pub listen_address: SocketAddr,
    /// The gateway configuration.
    pub config: Config,
    /// Personal Todoist API token.
    pub todoist_token: SecretString,
    /// Cancelled when the server should stop, in addition to Ctrl+C and
    /// SIGTERM.
    pub shutdown: CancellationToken,
}

/// Starts the server and serves requests until a termination signal arrives.
///
/// # Errors
///
/// Fails when the upstream client cannot be built, when the listen address
/// cannot be bound, or when the server stops with an I/O error.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        todoist_token,
        shutdown,
    }: ServeConfig,
) -> crate::Result<()> {
    let http_client = reqwest::Client::builder()
        .timeout(config.upstream.timeout())
        .build()
        .map_err(crate::Error::HttpClient)?;

    let client = TodoistClient::new(http_client, config.upstream.base_url()?, todoist_token);
    tracing::debug!(base_url = %client.base_url(), "Todoist client ready");

    let state = ServerState::new(&config, Arc::new(client), shutdown.clone());
    let router = router(&config, state);

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|source| crate::Error::Bind {
            address: listen_address,
            source,
        })?;

    let address = listener.local_addr().unwrap_or(listen_address);
    tracing::info!("GraphQL endpoint exposed at http://{address}{}", config.graph.path);

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown(shutdown))
        .await
        .map_err(crate::Error::Server)
}

/// The GraphQL routes: GET and POST at the graph path, wrapped with the
/// gateway timeout and CORS layers.
pub fn router(config: &Config, state: ServerState) -> Router {
    Router::new()
        .route(&config.graph.path, get(execute).post(execute))
        .layer(TimeoutLayer::new(config.gateway.timeout()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Executes one GraphQL request in a scope of its own.
///
/// The scope is dropped with the handler future, so a client going away or the
/// gateway timeout firing cancels whatever the request still has in flight.
async fn execute(State(state): State<ServerState>, request: axum::extract::Request) -> Response {
    if request.method() == Method::GET && accepts_html(request.headers()) {
        if let Some(graphiql) = state.graphiql() {
            return Html(graphiql.to_string()).into_response();
        }
    }

    let request = match GraphQLRequest::<GraphQLRejection>::from_request(request, &state).await {
        Ok(request) => request.into_inner(),
        Err(rejection) => return rejection.into_response(),
    };

    tracing::debug!(operation_name = ?request.operation_name, "executing request");

    let scope = RequestScope::with_cancellation(state.client().clone(), state.batching(), state.shutdown());
    let response = todoist_graph::execute(state.schema(), scope, request).await;

    GraphQLResponse::from(response).into_response()
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Waits for a termination signal or for `shutdown`, then lets the server
/// drain. Requests still running after the grace period are cancelled.
async fn graceful_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("Shutting down gracefully...");

    tokio::spawn(async move {
        tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
        shutdown.cancel();
    });
}
