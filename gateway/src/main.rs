use clap::crate_version;
use graph_server::ServeConfig;
use mimalloc::MiMalloc;
use tokio::runtime;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod args;
mod config;
mod telemetry;

const THREAD_NAME: &str = "todoist-gateway";

fn main() -> anyhow::Result<()> {
    let args = self::args::parse();
    let config = self::config::load(&args)?;

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    runtime.block_on(async move {
        telemetry::init(&args)?;

        let crate_version = crate_version!();
        tracing::info!("Todoist Gateway {crate_version}");

        let listen_address = config::listen_address(&args, &config);

        let config = ServeConfig {
            listen_address,
            config,
            todoist_token: args.todoist_token.clone(),
            shutdown: CancellationToken::new(),
        };

        graph_server::serve(config).await?;

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
