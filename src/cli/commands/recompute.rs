use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::recompute;
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::{AppError, AppResult};
use crate::utils::date::parse_date;
use crate::utils::time::{format_ms, today_local, week_bounds};

/// Incremental recompute over a bounded window, defaulting to the current
/// week.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Recompute {
        user,
        team,
        from,
        to,
    } = cmd
    {
        let today = today_local();
        let (week_from, _) = week_bounds(today);

        let from = match from {
            Some(s) => parse_date(s).ok_or_else(|| AppError::InvalidDate(s.clone()))?,
            None => week_from,
        };
        let to = match to {
            Some(s) => parse_date(s).ok_or_else(|| AppError::InvalidDate(s.clone()))?,
            None => today,
        };

        let mut pool = DbPool::open(&cfg.server_database)?;
        let days =
            recompute::recompute_window(&mut pool.conn, user, team.as_deref(), from, to)?;
        println!("Recomputed {} day bucket(s) for {} in {}..{}", days, user, from, to);

        for stat in stats::load_pair_stats(&pool.conn, user, team.as_deref())? {
            if stat.date >= from && stat.date <= to {
                println!("  {}  {}", stat.date, format_ms(stat.worked_ms));
            }
        }
    }
    Ok(())
}
