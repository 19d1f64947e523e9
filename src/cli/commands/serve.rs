use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::server;
use tracing_subscriber::EnvFilter;

/// Run the batch ingestion server until interrupted.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Serve { addr } = cmd {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();

        let addr = addr.clone().unwrap_or_else(|| cfg.listen_addr.clone());

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(server::serve(cfg, &addr))?;
    }
    Ok(())
}
