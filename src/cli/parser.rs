use clap::{Parser, Subcommand};

/// Command-line interface definition for worksync
/// Offline-first work-time tracking: sync server and day-bucket statistics
#[derive(Parser)]
#[command(
    name = "worksync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline-first work-time tracking: batch ingestion server and per-day worked-time statistics",
    long_about = None
)]
pub struct Cli {
    /// Override the server database path (useful for tests or custom DB)
    #[arg(global = true, long = "server-db")]
    pub server_db: Option<String>,

    /// Override the client database path
    #[arg(global = true, long = "client-db")]
    pub client_db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the configuration and both databases
    Init,

    /// Run the batch ingestion server
    Serve {
        /// Listen address (default: from configuration, 127.0.0.1:8080)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Rebuild every day bucket from the full event history
    Backfill {
        /// Restrict the backfill to a single user
        #[arg(long)]
        user: Option<String>,
    },

    /// Recompute a bounded window of day buckets for one user
    Recompute {
        /// User id
        #[arg(long)]
        user: String,

        /// Team id (omit for the no-team stream)
        #[arg(long)]
        team: Option<String>,

        /// Window start, YYYY-MM-DD (default: Monday of the current week)
        #[arg(long)]
        from: Option<String>,

        /// Window end, YYYY-MM-DD (default: today)
        #[arg(long)]
        to: Option<String>,
    },

    /// Manage the configuration file (view)
    Config {
        /// Print the current configuration to stdout
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,
    },

    /// Print or manage the internal audit log table
    Log {
        /// Print rows from the internal `log` table
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },
}
