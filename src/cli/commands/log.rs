use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;

/// Print the server's internal audit trail (ingests, recomputes).
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Log { print } = cmd
        && *print
    {
        let pool = DbPool::open(&cfg.server_database)?;
        for (date, operation, target, message) in load_log(&pool.conn)? {
            println!("{}  {:<10}  {:<20}  {}", date, operation, target, message);
        }
    }
    Ok(())
}
