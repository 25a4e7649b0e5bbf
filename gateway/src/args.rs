use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use secrecy::SecretString;
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

mod log;

pub(crate) use log::{LogLevel, LogStyle};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

#[derive(Debug, Parser)]
#[command(name = "The Todoist Gateway", version)]
/// A GraphQL gateway over the Todoist REST API
pub(crate) struct Args {
    /// Personal Todoist API token, sent upstream as a bearer token.
    #[arg(long, env = "TODOIST_TOKEN", value_parser = parse_token, hide_env_values = true)]
    pub todoist_token: SecretString,
    /// Port to listen on when no listen address is configured.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    /// IP address on which the server will listen for incoming connections. Overrides the port
    /// and the configuration file.
    #[arg(short, long)]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "TODOIST_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,
    /// Set the logging level
    #[arg(long = "log", env = "TODOIST_GATEWAY_LOG")]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "TODOIST_GATEWAY_LOG_STYLE", default_value_t = LogStyle::Text)]
    pub log_style: LogStyle,
}

impl Args {
    pub fn log_format<S>(&self) -> BoxedLayer<S>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    {
        let layer = tracing_subscriber::fmt::layer();

        match self.log_style {
            // for interactive terminals we provide colored output
            LogStyle::Text if atty::is(atty::Stream::Stdout) => layer.with_ansi(true).boxed(),
            // for server logs, colors are off
            LogStyle::Text => layer.with_ansi(false).boxed(),
            LogStyle::Json => layer.json().boxed(),
        }
    }
}

fn parse_token(value: &str) -> Result<SecretString, String> {
    if value.trim().is_empty() {
        return Err("the Todoist token must not be empty".to_string());
    }

    Ok(SecretString::new(value.to_string()))
}

pub(crate) fn parse() -> Args {
    Args::parse()
}
