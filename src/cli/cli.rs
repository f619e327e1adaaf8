use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Process Watchdog - alerts when watched processes stop on local or remote hosts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "WATCHDOG_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Listen address for the status API, overrides web_host
    #[arg(short = 'a', long, env = "WATCHDOG_ADDRESS")]
    pub address: Option<String>,

    /// Listen port for the status API, overrides web_port
    #[arg(short, long, env = "WATCHDOG_PORT")]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the local process list to a remote watchdog
    Agent {
        /// Listen address
        #[arg(short = 'a', long, env = "AGENT_HOST", default_value = "0.0.0.0")]
        address: String,

        /// Listen port
        #[arg(short, long, env = "AGENT_PORT", default_value_t = 8888)]
        port: u16,
    },
}
