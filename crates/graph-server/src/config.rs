//! The TOML configuration of the gateway.

use std::{fs, net::SocketAddr, path::Path, time::Duration};

use todoist_graph::BatchOptions;
use url::Url;

pub const DEFAULT_GRAPH_PATH: &str = "/graphql";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
/// Configuration struct to define settings for the Todoist gateway.
pub struct Config {
    /// Server bind settings
    #[serde(default)]
    pub network: NetworkConfig,
    /// Graph location and features, such as introspection
    #[serde(default)]
    pub graph: GraphConfig,
    /// How the Todoist REST API is reached
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// How the per-request loaders group their keys
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| crate::Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }
}

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub listen_address: Option<SocketAddr>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub path: String,
    pub introspection: bool,
    /// Serve GraphiQL to browsers on GET requests to the graph path.
    pub playground: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_GRAPH_PATH.to_string(),
            introspection: true,
            playground: false,
        }
    }
}

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Defaults to the public Todoist REST API.
    pub base_url: Option<Url>,
    /// Timeout for a single upstream call, connection included.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub timeout: Option<Duration>,
}

impl UpstreamConfig {
    pub fn base_url(&self) -> crate::Result<Url> {
        match self.base_url {
            Some(ref url) => Ok(url.clone()),
            None => Url::parse(todoist_client::DEFAULT_BASE_URL)
                .map_err(|err| crate::Error::UpstreamUrl(format!("{}: {err}", todoist_client::DEFAULT_BASE_URL))),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT)
    }
}

#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchingConfig {
    /// How long a batch window stays open. Zero dispatches on the next
    /// scheduler turn.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub delay: Option<Duration>,
    pub max_batch_size: Option<usize>,
}

impl BatchingConfig {
    pub fn options(&self) -> BatchOptions {
        let defaults = BatchOptions::default();

        BatchOptions {
            delay: self.delay.unwrap_or(defaults.delay),
            max_batch_size: self.max_batch_size.or(defaults.max_batch_size),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Timeout for gateway requests.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_GATEWAY_TIMEOUT)
    }
}
