use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use graph_server::config::Config;

use crate::args::Args;

pub(crate) fn load(args: &Args) -> anyhow::Result<Config> {
    match args.config {
        Some(ref path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// The command line wins over the configuration file, which wins over every
/// interface on `$PORT`.
pub(crate) fn listen_address(args: &Args, config: &Config) -> SocketAddr {
    args.listen_address
        .or(config.network.listen_address)
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port))
}
