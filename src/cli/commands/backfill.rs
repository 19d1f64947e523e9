use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::recompute;
use crate::db::events;
use crate::db::pool::DbPool;
use crate::errors::AppResult;

/// Full cache rebuild: replay every (user, team) stream from its first
/// event.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Backfill { user } = cmd {
        let mut pool = DbPool::open(&cfg.server_database)?;

        let pairs: Vec<(String, Option<String>)> = events::distinct_pairs(&pool.conn)?
            .into_iter()
            .filter(|(pair_user, _)| user.as_ref().is_none_or(|u| u == pair_user))
            .collect();

        let mut days = 0;
        for (pair_user, pair_team) in &pairs {
            days += recompute::backfill_pair(&mut pool.conn, pair_user, pair_team.as_deref())?;
        }

        println!(
            "Backfilled {} day bucket(s) across {} stream(s)",
            days,
            pairs.len()
        );
    }
    Ok(())
}
