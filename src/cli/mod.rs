use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod handlers;

pub use handlers::dispatch;

/// `recwatch` - the .REC surveillance bot for Discord.
#[derive(Parser, Debug)]
#[command(name = "recwatch")]
#[command(version)]
#[command(about = "An always-watching Discord persona bot.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.recwatch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and start broadcasting
    Run,

    /// Encode or decode a word with the substitution cipher
    Cipher {
        #[command(subcommand)]
        action: CipherCommands,
    },

    /// Inspect the broadcast schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommands,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CipherCommands {
    Encode {
        word: String,
        /// Shift (1-25); defaults to the configured secret shift
        #[arg(long)]
        shift: Option<u8>,
    },
    Decode {
        word: String,
        #[arg(long)]
        shift: Option<u8>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Print the next fire instants of the configured policy
    Preview {
        #[arg(long, default_value = "5")]
        count: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective config with credentials masked
    Show,
}
