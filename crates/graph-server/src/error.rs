use std::{io, net::SocketAddr, path::PathBuf};

/// The gateway server error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file could not be read
    #[error("reading config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML, or has unknown keys
    #[error("parsing config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid upstream url: {0}")]
    UpstreamUrl(String),
    #[error("building http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Cannot listen on the requested address
    #[error("binding {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// Cannot start the HTTP server
    #[error("starting server: {0}")]
    Server(#[source] io::Error),
}
