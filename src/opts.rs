use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, author = "ydolev", about = "Create containers and wire them into networks")]
pub struct Opts {
    /// Configuration file.
    #[arg(long, global = true, env = "NETCTL_CONFIG", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// Create a container, attach it to a network and print its address.
    Up {
        /// Container name; generated when omitted.
        #[arg(long)]
        name: Option<String>,
        network: String,
    },

    /// Create, attach, inspect, detach and delete a container.
    Cycle {
        /// Container name; generated when omitted.
        #[arg(long)]
        name: Option<String>,
        network: String,
    },

    /// Print the parsed status of an existing container.
    Status { name: String },
}
