//! retune - Remote control for a networked media player

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod error;
mod poll;
mod remote;
mod session;
mod sync;
mod utils;

use cli::commands::{self, Control};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "retune=debug"
    } else {
        "retune=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let server = cli.server;
    match cli.command {
        Commands::Servers { action } => commands::servers(action).await?,
        Commands::Ping => commands::ping(server).await?,
        Commands::Status => commands::status(server).await?,
        Commands::Watch { interval, resume } => commands::watch(server, interval, resume).await?,
        Commands::PlayPause => commands::control(server, Control::PlayPause).await?,
        Commands::Next => commands::control(server, Control::Next).await?,
        Commands::Prev => commands::control(server, Control::Prev).await?,
        Commands::Seek { position } => commands::control(server, Control::Seek(position)).await?,
        Commands::VolumeUp => commands::control(server, Control::VolumeUp).await?,
        Commands::VolumeDown => commands::control(server, Control::VolumeDown).await?,
        Commands::Mute => commands::control(server, Control::Mute).await?,
        Commands::Play { uri } => commands::control(server, Control::Play(uri)).await?,
        Commands::Shuffle => commands::shuffle(server).await?,
        Commands::Repeat => commands::repeat(server).await?,
        Commands::Info { field } => commands::info(server, field).await?,
        Commands::Cover { output, max_size } => commands::cover(server, output, max_size).await?,
        Commands::Sync { output } => commands::sync_catalog(server, output).await?,
        Commands::Completion { shell } => commands::completion(shell),
    }

    Ok(())
}
