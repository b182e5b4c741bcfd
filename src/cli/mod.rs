//! CLI module for retune

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
mod display;

use crate::remote::ServerEndpoint;

#[derive(Parser, Debug)]
#[command(name = "retune", about = "Remote control for a networked media player")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server address (HOST or HOST:PORT), defaults to the last server used
    #[arg(short, long, global = true, env = "RETUNE_SERVER")]
    pub server: Option<ServerEndpoint>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List, add or remove saved servers
    Servers {
        #[command(subcommand)]
        action: Option<ServerAction>,
    },

    /// Check that the server answers
    Ping,

    /// Show what the server is playing
    Status,

    /// Follow playback live with single-key controls
    Watch {
        /// Seconds between polls (overrides settings.json)
        #[arg(short, long, conflicts_with = "resume")]
        interval: Option<u64>,

        /// Continue the last watch session without waiting for the server
        #[arg(long)]
        resume: bool,
    },

    /// Toggle between playing and paused
    PlayPause,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Prev,

    /// Jump to a position in the current track
    Seek {
        /// Position in seconds
        #[arg(value_name = "SECONDS")]
        position: u32,
    },

    /// Raise the volume one step
    VolumeUp,

    /// Lower the volume one step
    VolumeDown,

    /// Toggle mute
    Mute,

    /// Play a track from the catalog
    Play {
        /// Track URI as stored in the catalog
        uri: String,
    },

    /// Advance to the next shuffle mode
    Shuffle,

    /// Advance to the next repeat mode
    Repeat,

    /// Print a single field of the playback state
    Info {
        #[arg(value_enum)]
        field: InfoField,
    },

    /// Save the current track's cover art
    Cover {
        /// Output file (defaults to cover.<ext> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Downscale so neither side exceeds this many pixels
        #[arg(long)]
        max_size: Option<u32>,
    },

    /// Download the server's catalog database
    Sync {
        /// Destination file (defaults to the configured catalog path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServerAction {
    /// Show saved servers, most recently used first
    List,
    /// Check a server and save it
    Add {
        #[arg(value_name = "HOST:PORT")]
        address: ServerEndpoint,
    },
    /// Forget a saved server
    Remove {
        #[arg(value_name = "HOST:PORT")]
        address: ServerEndpoint,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Album,
    Artist,
    Title,
    Position,
    Duration,
    DatabaseSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_server_and_command() {
        let cli = Cli::try_parse_from(["retune", "--server", "192.168.1.5", "seek", "90"]).unwrap();
        assert_eq!(cli.server, Some(ServerEndpoint::new("192.168.1.5", 8484)));
        assert!(matches!(cli.command, Commands::Seek { position: 90 }));
    }

    #[test]
    fn test_parse_info_field() {
        let cli = Cli::try_parse_from(["retune", "info", "database-size"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Info {
                field: InfoField::DatabaseSize
            }
        ));
    }

    #[test]
    fn test_resume_rejects_interval() {
        assert!(Cli::try_parse_from(["retune", "watch", "--resume", "--interval", "5"]).is_err());
        let cli = Cli::try_parse_from(["retune", "watch", "--resume"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Watch {
                interval: None,
                resume: true
            }
        ));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["retune", "-s", "host:99999", "ping"]).is_err());
    }
}
