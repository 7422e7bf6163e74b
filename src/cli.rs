use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// keyvend — VPN key vending service
#[derive(Parser)]
#[command(name = "keyvend", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the service
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Manage serving locations
    Location {
        #[command(subcommand)]
        command: LocationCommands,
    },

    /// Manage the key inventory
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
}

#[derive(Subcommand)]
pub enum LocationCommands {
    /// Register a new serving location
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        endpoint: String,
        /// Base monthly rate, e.g. 500.00
        #[arg(long)]
        rate: String,
    },
    /// List locations with free/total key counts
    List,
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Import keys into a location's pool
    Import {
        #[arg(long)]
        location_id: String,
        /// A single key token
        #[arg(long)]
        token: Option<String>,
        /// File with one key token per line
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
