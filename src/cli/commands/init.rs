use crate::cli::parser::Cli;
use crate::client::store::ClientStore;
use crate::config::Config;
use crate::db::pool::DbPool;
use crate::errors::AppResult;

/// Create the configuration file (unless running in test mode) and both
/// database schemas.
pub fn handle(cli: &Cli) -> AppResult<()> {
    let mut cfg = Config::default();
    if let Some(db) = &cli.server_db {
        cfg.server_database = db.clone();
    }
    if let Some(db) = &cli.client_db {
        cfg.client_database = db.clone();
    }

    if !cli.test {
        cfg.save()?;
        println!(
            "Configuration written to {}",
            Config::config_file().display()
        );
    }

    DbPool::open(&cfg.server_database)?;
    ClientStore::open(&cfg.client_database)?;

    println!("Server database ready at {}", cfg.server_database);
    println!("Client database ready at {}", cfg.client_database);
    Ok(())
}
