use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Replit Database client - get, set, delete and list keys")]
pub struct Cli {
    /// Database URL to use instead of /tmp/replitdb or REPLIT_DB_URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the value stored under a key
    Get {
        key: String,
        /// Decode the value as JSON and pretty-print it
        #[arg(long)]
        json: bool,
    },
    /// Create or update a key
    Set {
        key: String,
        value: String,
        /// Validate the value as JSON before storing it
        #[arg(long)]
        json: bool,
    },
    /// Delete a key
    Delete {
        key: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List keys starting with a prefix
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Save a database URL to the cached URL file
    CacheUrl { url: String },
}
