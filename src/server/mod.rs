pub mod auth;
pub mod ingest;
pub mod live;
pub mod routes;
pub mod side_effects;

use crate::config::Config;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::server::auth::StaticTokenValidator;
use crate::server::live::LiveHub;
use crate::server::routes::{ServerState, router};
use crate::server::side_effects::{LogNotifier, SideEffectWorker};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Wire the store, the side-effect worker and the router together and
/// serve until the process is stopped.
pub async fn serve(cfg: &Config, addr: &str) -> AppResult<()> {
    let db = DbPool::open(&cfg.server_database)?.into_shared();
    let live = LiveHub::new();

    let (effects_tx, effects_rx) = mpsc::unbounded_channel();
    SideEffectWorker::new(db.clone(), live.clone(), Arc::new(LogNotifier)).spawn(effects_rx);

    let tokens: HashMap<String, String> = cfg
        .tokens
        .iter()
        .map(|t| (t.token.clone(), t.user_id.clone()))
        .collect();
    let sessions = Arc::new(StaticTokenValidator::new(
        tokens,
        cfg.expired_tokens.clone(),
    ));

    let state = Arc::new(ServerState {
        db,
        sessions,
        effects: effects_tx,
        live,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "worksync server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
