// SPDX-License-Identifier: MIT OR Apache-2.0
//! `titlecard` - terminal preview for animated title-card storyboards
//!
//! Plays a storyboard the way the editor's preview does:
//! - Scenes go live in order for their durations
//! - A swoosh cue plays on every transition
//! - A one-line timeline tracks progress
//!
//! ## Architecture
//!
//! Playback and sound come from `titlecard_sequencer`. This binary loads the
//! storyboard and settings, picks an audio backend, and drives one preview on
//! a Tokio runtime.

mod audio;
mod preview;

use clap::Parser;
use preview::PreviewSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use titlecard_sequencer::settings::SETTINGS_FILE_NAME;
use titlecard_sequencer::{
    PlaybackSettings, SettingsError, Storyboard, StoryboardError, ToneGenerator,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Application errors
#[derive(Debug, Error)]
enum AppError {
    #[error("Failed to load settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to load storyboard: {0}")]
    Storyboard(#[from] StoryboardError),

    #[error("Invalid --stop-after value: {0}")]
    StopAfter(f32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Preview animated title cards with swoosh transitions
#[derive(Debug, Parser)]
#[command(name = "titlecard", version, about)]
struct Cli {
    /// Storyboard to play (RON); the starter scenes are used when omitted
    #[arg(long, value_name = "FILE")]
    scenes: Option<PathBuf>,

    /// Playback settings (RON); defaults to ./titlecard.ron when present
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Play without transition sounds
    #[arg(long)]
    mute: bool,

    /// Stop the preview after this many seconds
    #[arg(long, value_name = "SECS")]
    stop_after: Option<f32>,

    /// Print the scene list and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("titlecard_app=info,titlecard_sequencer=info"));

    // Logs go to stderr; stdout carries the timeline.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting titlecard v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        tracing::error!("Preview failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = load_settings(cli.settings.as_deref())?;
    if cli.mute {
        settings.sound_enabled = false;
    }

    let storyboard = match &cli.scenes {
        Some(path) => Storyboard::load(path)?,
        None => Storyboard::starter(),
    };

    if cli.list {
        print_scenes(&storyboard);
        return Ok(());
    }

    let stop_after = cli
        .stop_after
        .map(|secs| Duration::try_from_secs_f32(secs).map_err(|_| AppError::StopAfter(secs)))
        .transpose()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let tone = Arc::new(ToneGenerator::new(audio::output_backend(!settings.sound_enabled)));
    let mut session = PreviewSession::new(storyboard, settings, tone);

    let outcome = runtime.block_on(async {
        let mut stdout = std::io::stdout();
        session.run(&mut stdout, stop_after).await
    })?;
    drop(session);

    tracing::info!("{}", outcome.status_text());
    Ok(())
}

/// Explicit settings file, else ./titlecard.ron if it exists, else defaults
fn load_settings(path: Option<&Path>) -> Result<PlaybackSettings, SettingsError> {
    match path {
        Some(path) => PlaybackSettings::load(path),
        None => {
            let default_path = Path::new(SETTINGS_FILE_NAME);
            if default_path.exists() {
                PlaybackSettings::load(default_path)
            } else {
                Ok(PlaybackSettings::default())
            }
        }
    }
}

fn print_scenes(storyboard: &Storyboard) {
    for (index, scene) in storyboard.scenes().enumerate() {
        let selected = if storyboard.selected() == Some(&scene.id) { "*" } else { " " };
        println!(
            "{selected} {:>2}. {:<24} {:>5.1}s  {:<14} {}",
            index + 1,
            scene.display_title(),
            scene.duration,
            scene.animation.label(),
            scene.id
        );
    }
    println!("    total {:.1}s", storyboard.total_duration());
}
