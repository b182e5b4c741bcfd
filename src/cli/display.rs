//! Terminal rendering of playback state

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::poll::{PollUpdate, UpdateKind};
use crate::remote::{PlaybackSnapshot, PlaybackStatus};
use crate::utils::format_time;

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn status_label(status: PlaybackStatus) -> colored::ColoredString {
    match status {
        PlaybackStatus::Playing => "playing".green(),
        PlaybackStatus::Paused => "paused".yellow(),
        PlaybackStatus::Idle => "idle".dimmed(),
        PlaybackStatus::Unknown => "unknown".red(),
    }
}

/// Print a snapshot for the one-shot `status` command
pub fn print_snapshot(snapshot: &PlaybackSnapshot) {
    println!("{} {}", "Status:".bold(), status_label(snapshot.status));
    println!("  Track:  {}", snapshot.track.green());
    println!("  Artist: {}", snapshot.artist);
    println!("  Album:  {}", snapshot.album);
    println!(
        "  Time:   {} / {}",
        format_time(snapshot.clamped_position()),
        format_time(snapshot.duration_secs)
    );
    if snapshot.has_cover {
        println!("  Cover art available ({})", "retune cover".cyan());
    }
}

/// Progress bar for a byte transfer of known or unknown size
pub fn transfer_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) if total > 0 => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                style("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                    .progress_chars("#>-"),
            );
            bar
        }
        _ => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(style("{spinner:.green} {bytes} {msg}"));
            bar
        }
    }
}

/// Live now-playing line for `watch`
pub struct NowPlayingDisplay {
    bar: ProgressBar,
}

impl NowPlayingDisplay {
    pub fn new() -> Self {
        let bar = ProgressBar::new(1);
        bar.set_style(style("{prefix:.cyan} [{bar:30.cyan/blue}] {msg}").progress_chars("=> "));
        bar.set_message("waiting for playback...");
        Self { bar }
    }

    pub fn update(&self, update: &PollUpdate) {
        let snapshot = &update.snapshot;
        let position = snapshot.clamped_position();

        self.bar.set_length(u64::from(snapshot.duration_secs.max(1)));
        self.bar.set_position(u64::from(position));
        self.bar.set_prefix(format!(
            "{} / {}",
            format_time(position),
            format_time(snapshot.duration_secs)
        ));

        // Partial updates only move the position
        if update.kind == UpdateKind::Full {
            self.bar.set_message(format!(
                "{} {} - {}",
                status_label(snapshot.status),
                snapshot.track.bold(),
                snapshot.artist
            ));
            if snapshot.status != PlaybackStatus::Idle {
                let cover = match &update.cover {
                    Some(cover) => {
                        let (width, height) = cover.dimensions();
                        format!(" [cover {}x{}]", width, height)
                    }
                    None => String::new(),
                };
                self.bar.println(format!(
                    "{} {} - {} ({}){}",
                    "Now playing:".cyan(),
                    snapshot.track,
                    snapshot.artist,
                    snapshot.album,
                    cover.dimmed()
                ));
            }
        }
    }

    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
