//! CLI command handlers

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use dialoguer::Select;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::display::{self, NowPlayingDisplay};
use super::{InfoField, ServerAction};
use crate::config::{ServerList, Settings};
use crate::error::RemoteError;
use crate::poll::RetainedSession;
use crate::remote::{CommandDispatcher, RemoteClient, ServerEndpoint};
use crate::session::Session;
use crate::sync::{SyncEngine, SyncProgress};
use crate::utils::{CoverImage, format_time};

/// Updates buffered between the poll engine and the terminal
const UPDATE_CAPACITY: usize = 64;

const CONNECT_HINT: &str = "Can't connect to server. Check your settings.";

/// Turn a protocol error into a CLI error, with a hint for unreachable servers
fn report(err: RemoteError) -> anyhow::Error {
    if err.is_connection() {
        anyhow::Error::new(err).context(CONNECT_HINT)
    } else {
        anyhow::Error::new(err)
    }
}

/// Pick the server to talk to: `--server`, else the saved list
fn resolve_server(server: Option<ServerEndpoint>) -> Result<ServerEndpoint> {
    if let Some(endpoint) = server {
        return Ok(endpoint);
    }

    let list = ServerList::load()?;
    match list.servers.as_slice() {
        [] => anyhow::bail!(
            "No server configured. Run 'retune servers add HOST:PORT' or pass --server."
        ),
        [only] => Ok(only.endpoint.clone()),
        servers if io::stdin().is_terminal() => {
            let labels: Vec<String> = servers.iter().map(|s| s.endpoint.to_string()).collect();
            let choice = Select::new()
                .with_prompt("Select a server")
                .items(&labels)
                .default(0)
                .interact()
                .context("Failed to read server selection")?;
            Ok(servers[choice].endpoint.clone())
        }
        [first, ..] => Ok(first.endpoint.clone()),
    }
}

fn client_for(endpoint: ServerEndpoint, settings: &Settings) -> RemoteClient {
    RemoteClient::new(endpoint, Arc::new(settings.transport())).with_retry(settings.retry_policy())
}

fn connect(server: Option<ServerEndpoint>, settings: &Settings) -> Result<RemoteClient> {
    let endpoint = resolve_server(server)?;
    debug!("Using server {}", endpoint);
    Ok(client_for(endpoint, settings))
}

/// Move `endpoint` to the front of the saved server list
fn remember(endpoint: &ServerEndpoint) {
    let result = ServerList::load().and_then(|mut list| {
        list.remember(endpoint.clone());
        list.save()
    });
    if let Err(e) = result {
        warn!("Could not update saved servers: {:#}", e);
    }
}

/// Handle the `servers` command
pub async fn servers(action: Option<ServerAction>) -> Result<()> {
    match action.unwrap_or(ServerAction::List) {
        ServerAction::List => {
            let list = ServerList::load()?;
            if list.is_empty() {
                println!("{}", "No saved servers.".yellow());
                println!("Add one with {}.", "retune servers add HOST:PORT".cyan());
                return Ok(());
            }

            println!("{}", "Saved servers:".green().bold());
            for server in &list.servers {
                let marker = if list.most_recent() == Some(&server.endpoint) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "  {} {} (last used {})",
                    marker,
                    server.endpoint.to_string().green(),
                    server.last_used.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ServerAction::Add { address } => {
            let settings = Settings::load()?;
            println!("{}", format!("Checking {}...", address).cyan());
            client_for(address.clone(), &settings)
                .ping()
                .await
                .map_err(report)?;

            let mut list = ServerList::load()?;
            list.remember(address.clone());
            list.save()?;
            println!("{} {}", "Saved".green().bold(), address);
        }
        ServerAction::Remove { address } => {
            let mut list = ServerList::load()?;
            if list.remove(&address) {
                list.save()?;
                println!("Removed {}", address);
            } else {
                println!("{}", format!("{} is not saved.", address).yellow());
            }
        }
    }

    Ok(())
}

/// Handle the `ping` command
pub async fn ping(server: Option<ServerEndpoint>) -> Result<()> {
    let settings = Settings::load()?;
    let client = connect(server, &settings)?;

    client.ping().await.map_err(report)?;
    println!("{} {}", "Server reachable:".green(), client.endpoint());
    remember(client.endpoint());

    Ok(())
}

/// Handle the `status` command
pub async fn status(server: Option<ServerEndpoint>) -> Result<()> {
    let settings = Settings::load()?;
    let client = connect(server, &settings)?;

    let status = client.status().await.map_err(report)?;
    if status.is_idle() {
        println!("{}", "Nothing is playing.".yellow());
        return Ok(());
    }

    let snapshot = client.snapshot().await.map_err(report)?;
    display::print_snapshot(&snapshot);
    Ok(())
}

/// Fire-and-forget controls
#[derive(Debug, Clone)]
pub enum Control {
    PlayPause,
    Next,
    Prev,
    Seek(u32),
    VolumeUp,
    VolumeDown,
    Mute,
    Play(String),
}

/// Handle the transport control commands
pub async fn control(server: Option<ServerEndpoint>, control: Control) -> Result<()> {
    let settings = Settings::load()?;
    let client = connect(server, &settings)?;
    let dispatcher = CommandDispatcher::new(client.endpoint().clone(), client.transport());

    let sent = match &control {
        Control::PlayPause => dispatcher.play_pause().await,
        Control::Next => dispatcher.next().await,
        Control::Prev => dispatcher.prev().await,
        Control::Seek(position) => dispatcher.seek(*position).await,
        Control::VolumeUp => dispatcher.volume_up().await,
        Control::VolumeDown => dispatcher.volume_down().await,
        Control::Mute => dispatcher.mute().await,
        Control::Play(uri) => dispatcher.play_uri(uri).await,
    };
    sent.map_err(report)?;

    debug!("Sent {:?} to {}", control, client.endpoint());
    Ok(())
}

/// Handle the `shuffle` command
pub async fn shuffle(server: Option<ServerEndpoint>) -> Result<()> {
    let settings = Settings::load()?;
    let mode = connect(server, &settings)?.shuffle().await.map_err(report)?;
    println!("Shuffle: {}", mode.to_string().cyan());
    Ok(())
}

/// Handle the `repeat` command
pub async fn repeat(server: Option<ServerEndpoint>) -> Result<()> {
    let settings = Settings::load()?;
    let mode = connect(server, &settings)?.repeat().await.map_err(report)?;
    println!("Repeat: {}", mode.to_string().cyan());
    Ok(())
}

fn seconds(value: u64) -> String {
    format_time(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Handle the `info` command
pub async fn info(server: Option<ServerEndpoint>, field: InfoField) -> Result<()> {
    let settings = Settings::load()?;
    let client = connect(server, &settings)?;

    let value = match field {
        InfoField::Album => client.album().await,
        InfoField::Artist => client.artist().await,
        InfoField::Title => client.title().await,
        InfoField::Position => client.position().await.map(seconds),
        InfoField::Duration => client.duration().await.map(seconds),
        InfoField::DatabaseSize => client
            .database_size()
            .await
            .map(|bytes| format!("{} bytes ({:.1} MB)", bytes, bytes as f64 / 1_048_576.0)),
    }
    .map_err(report)?;

    println!("{}", value.trim_end());
    Ok(())
}

/// Handle the `cover` command
pub async fn cover(
    server: Option<ServerEndpoint>,
    output: Option<PathBuf>,
    max_size: Option<u32>,
) -> Result<()> {
    let settings = Settings::load()?;
    let client = connect(server, &settings)?;

    if !client.cover_exists().await.map_err(report)? {
        println!("{}", "No cover art for the current track.".yellow());
        return Ok(());
    }

    let data = client.cover_image().await.map_err(report)?;
    let cover = tokio::task::spawn_blocking(move || CoverImage::decode(&data)).await??;
    let path = output.unwrap_or_else(|| PathBuf::from(format!("cover.{}", cover.extension())));

    let (width, height) = cover.dimensions();
    let target = path.clone();
    tokio::task::spawn_blocking(move || cover.save(&target, max_size)).await??;

    println!(
        "{} {} ({}x{})",
        "Saved cover art to".green(),
        path.display(),
        width,
        height
    );
    Ok(())
}

/// Handle the `sync` command
pub async fn sync_catalog(server: Option<ServerEndpoint>, output: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load()?;
    let client = connect(server, &settings)?;
    let destination = match output {
        Some(path) => path,
        None => settings.catalog_path()?,
    };

    // The size only sizes the progress bar, so a failed query is not fatal
    let expected = match client.database_size().await {
        Ok(size) => Some(size),
        Err(e) if e.is_connection() => return Err(report(e)),
        Err(e) => {
            debug!("Catalog size unavailable: {}", e);
            None
        }
    };

    println!(
        "Syncing catalog from {} to {}",
        client.endpoint().to_string().green(),
        destination.display()
    );

    let bar = display::transfer_bar(expected);
    let (tx, mut rx) = mpsc::channel(UPDATE_CAPACITY);
    let task = SyncEngine::new(client.transport())
        .with_chunk_size(settings.sync_chunk_size)
        .start(client.endpoint().clone(), destination.clone(), Some(tx));

    while let Some(event) = rx.recv().await {
        match event {
            SyncProgress::Started { .. } => bar.set_message("downloading"),
            SyncProgress::Chunk { bytes_received } => bar.set_position(bytes_received),
            SyncProgress::Complete(_) => break,
        }
    }

    let result = task.wait().await;
    if !result.is_success() {
        bar.abandon_with_message("failed");
        match result.detail() {
            Some(detail) => anyhow::bail!("{} ({})", result.user_message(), detail),
            None => anyhow::bail!("{}", result.user_message()),
        }
    }

    bar.finish_with_message("done");
    println!();
    println!("{}", result.user_message().green().bold());
    println!("  Saved to: {}", destination.display());
    Ok(())
}

/// Handle the `watch` command
pub async fn watch(server: Option<ServerEndpoint>, interval: Option<u64>, resume: bool) -> Result<()> {
    let settings = Settings::load()?;
    let session_path = RetainedSession::default_path()?;
    let catalog_path = settings.catalog_path()?;
    let (tx, mut updates) = mpsc::channel(UPDATE_CAPACITY);

    let retained = if resume {
        RetainedSession::take(&session_path)?
    } else {
        None
    };

    let session = match retained {
        Some(retained) if server.as_ref().is_none_or(|s| *s == retained.endpoint) => {
            println!(
                "Resuming session with {} from {}",
                retained.endpoint.to_string().green(),
                retained.captured_at.format("%Y-%m-%d %H:%M")
            );
            Session::restore(
                Arc::new(settings.transport()),
                settings.retry_policy(),
                retained,
                tx,
            )
        }
        _ => {
            let client = connect(server, &settings)?;
            client.ping().await.map_err(report)?;
            remember(client.endpoint());

            let interval = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| settings.poll_interval());
            Session::start(client, interval, tx)
        }
    }
    .with_chunk_size(settings.sync_chunk_size);

    println!(
        "Watching {}",
        session.client().endpoint().to_string().green()
    );

    println!(
        "{}",
        "Keys: p play/pause, n next, b previous, +/- volume, m mute, s sync, q quit (then Enter)"
            .dimmed()
    );

    let display = NowPlayingDisplay::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => display.update(&update),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_key(&session, &display, line.trim(), &catalog_path).await? {
                        break;
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    display.finish();
    match session.retain().await {
        Ok(retained) => {
            retained.save(&session_path)?;
            println!("Session saved. Continue with {}.", "retune watch --resume".cyan());
        }
        Err(e) => warn!("Could not retain session: {}", e),
    }

    Ok(())
}

/// Apply one key command; returns false when the user asked to quit
async fn handle_key(
    session: &Session,
    display: &NowPlayingDisplay,
    key: &str,
    catalog_path: &Path,
) -> Result<bool> {
    let dispatcher = session.dispatcher();
    let sent = match key {
        "" => return Ok(true),
        "q" => return Ok(false),
        "p" => dispatcher.play_pause().await,
        "n" => dispatcher.next().await,
        "b" => dispatcher.prev().await,
        "+" => dispatcher.volume_up().await,
        "-" => dispatcher.volume_down().await,
        "m" => dispatcher.mute().await,
        "s" => {
            display.println("Syncing catalog, polling paused...".cyan().to_string());
            match session.sync_catalog(catalog_path.to_path_buf(), None).await {
                Ok(result) if result.is_success() => {
                    display.println(result.user_message().green().to_string())
                }
                Ok(result) => display.println(result.user_message().red().to_string()),
                Err(e) => display.println(format!("Sync unavailable: {}", e).red().to_string()),
            }
            return Ok(true);
        }
        other => {
            display.println(format!("Unknown key {:?}", other).yellow().to_string());
            return Ok(true);
        }
    };

    if let Err(e) = sent {
        let message = if e.is_connection() {
            CONNECT_HINT.to_string()
        } else {
            e.to_string()
        };
        display.println(message.red().to_string());
    }
    Ok(true)
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as CommandFactory>::command();
    generate(shell, &mut cmd, "retune", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Action;
    use crate::remote::testing::ScriptedTransport;

    #[tokio::test]
    async fn test_sync_key_survives_stopped_engine() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Action::Status, "playing")
                .respond(Action::All, "playing/A/B/C/1/100/false"),
        );
        let client = RemoteClient::new(ServerEndpoint::new("192.168.1.5", 8484), transport.clone());
        let (tx, rx) = mpsc::channel(UPDATE_CAPACITY);
        drop(rx);
        let session = Session::start(client, Duration::from_millis(20), tx);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let display = NowPlayingDisplay::new();
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.db");

        assert!(handle_key(&session, &display, "s", &catalog).await.unwrap());
        assert_eq!(transport.count(Action::Sync), 0);
        assert!(!catalog.exists());
        assert!(!handle_key(&session, &display, "q", &catalog).await.unwrap());
        display.finish();
    }
}
