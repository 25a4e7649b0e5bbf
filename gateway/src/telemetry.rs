use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::Args;

pub(crate) fn init(args: &Args) -> anyhow::Result<()> {
    let env_filter = EnvFilter::new(args.log_level.unwrap_or_default().as_filter_str());

    tracing_subscriber::registry()
        .with(args.log_format())
        .with(env_filter)
        .try_init()?;

    Ok(())
}
