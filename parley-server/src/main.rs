//! parley server - broadcast chat daemon

use tracing::{error, info};

use parley_server::{ConfigLoader, Server, SharedState};
use parley_utils::{init_logging_with_config, LogConfig, Result};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::load()?,
    };
    args.apply(&mut config);
    ConfigLoader::validate(&config)?;

    init_logging_with_config(LogConfig::server().with_filter(args.log_filter(&config)))?;
    info!("parley server {} starting", env!("CARGO_PKG_VERSION"));

    let shared = SharedState::new(config);
    let server = Server::bind(shared.clone()).await?;
    info!("Listening on {}", server.local_addr()?);

    let accept_loop = tokio::spawn(server.run());

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received"),
        Err(e) => error!("Failed to listen for interrupt: {}", e),
    }

    shared.shutdown();
    if let Err(e) = accept_loop.await {
        error!("Accept loop ended abnormally: {}", e);
    }

    info!(
        "parley server stopped ({} messages exchanged)",
        shared.history.len()
    );
    Ok(())
}
