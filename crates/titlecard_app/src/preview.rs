// SPDX-License-Identifier: MIT OR Apache-2.0
//! Terminal preview of a storyboard.
//!
//! This module handles:
//! - Starting playback and feeding the transition cue
//! - Redrawing a one-line timeline on every state change
//! - Stopping on Ctrl-C or after an optional cutoff
//! - Tearing down playback and audio on every exit path

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use titlecard_sequencer::{
    PlaybackSettings, PlaybackSnapshot, Sequencer, Storyboard, TimelineLayout, ToneGenerator,
};

/// Width of the progress bar in characters
pub const BAR_WIDTH: usize = 40;

/// How a preview ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Every scene played and the timeline reset
    Completed,
    /// The cutoff elapsed first
    CutOff,
    /// The user pressed Ctrl-C
    Interrupted,
    /// The storyboard had no scenes
    Empty,
}

impl PreviewOutcome {
    /// Get a status string for display
    pub fn status_text(&self) -> &'static str {
        match self {
            PreviewOutcome::Completed => "Preview complete",
            PreviewOutcome::CutOff => "Preview stopped at cutoff",
            PreviewOutcome::Interrupted => "Preview interrupted",
            PreviewOutcome::Empty => "Nothing to preview",
        }
    }
}

/// One preview of a storyboard with its playback and audio resources
pub struct PreviewSession {
    storyboard: Storyboard,
    sequencer: Sequencer,
    tone: Arc<ToneGenerator>,
    sound_enabled: bool,
}

impl PreviewSession {
    /// Create a session; nothing plays until [`run`](Self::run)
    pub fn new(storyboard: Storyboard, settings: PlaybackSettings, tone: Arc<ToneGenerator>) -> Self {
        let sound_enabled = settings.sound_enabled;
        let sequencer = Sequencer::new(settings).with_cue(tone.clone());
        Self {
            storyboard,
            sequencer,
            tone,
            sound_enabled,
        }
    }

    /// Play the storyboard once, drawing the timeline to `out`.
    ///
    /// Ctrl-C interrupts playback.
    pub async fn run(
        &mut self,
        out: &mut impl Write,
        stop_after: Option<Duration>,
    ) -> std::io::Result<PreviewOutcome> {
        self.run_until(out, stop_after, tokio::signal::ctrl_c()).await
    }

    /// Like [`run`](Self::run), interrupted when `interrupt` completes
    pub async fn run_until<F: Future>(
        &mut self,
        out: &mut impl Write,
        stop_after: Option<Duration>,
        interrupt: F,
    ) -> std::io::Result<PreviewOutcome> {
        let outcome = self.play(out, stop_after, interrupt).await;
        self.teardown();
        writeln!(out)?;
        outcome
    }

    async fn play<F: Future>(
        &mut self,
        out: &mut impl Write,
        stop_after: Option<Duration>,
        interrupt: F,
    ) -> std::io::Result<PreviewOutcome> {
        let mut rx = self.sequencer.subscribe();
        let scenes = self.storyboard.to_vec();
        self.sequencer.select(self.storyboard.selected().cloned());
        if !self.sequencer.start(&scenes, self.sound_enabled) {
            return Ok(PreviewOutcome::Empty);
        }

        let cutoff = async {
            match stop_after {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(cutoff);
        // Created once so an interrupt that lands mid-redraw is not lost.
        tokio::pin!(interrupt);

        let mut finished = false;
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Ok(PreviewOutcome::Completed);
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    write!(out, "\r{}", render_line(&self.storyboard, &snapshot))?;
                    out.flush()?;

                    if !snapshot.is_playing && snapshot.progress >= 1.0 {
                        finished = true;
                    } else if finished && snapshot.progress == 0.0 {
                        return Ok(PreviewOutcome::Completed);
                    }
                }
                _ = &mut cutoff => {
                    self.sequencer.stop();
                    return Ok(PreviewOutcome::CutOff);
                }
                _ = &mut interrupt => {
                    self.sequencer.stop();
                    return Ok(PreviewOutcome::Interrupted);
                }
            }
        }
    }

    /// Stop playback and release the audio device
    pub fn teardown(&mut self) {
        self.sequencer.stop();
        self.tone.shutdown();
    }

    /// Current playback state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.sequencer.snapshot()
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Render the timeline as `[####------] 42%  Neon Velocity (Slide Left)`
pub fn render_line(storyboard: &Storyboard, snapshot: &PlaybackSnapshot) -> String {
    let layout = TimelineLayout::new(storyboard.scenes(), snapshot);
    let filled = ((layout.fill * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    let bar: String = "#".repeat(filled) + &"-".repeat(BAR_WIDTH - filled);

    let caption = snapshot
        .active_scene_id
        .as_ref()
        .and_then(|id| storyboard.scene(id))
        .map(|scene| format!("{} ({})", scene.display_title(), scene.animation.label()))
        .unwrap_or_default();

    let marker = if snapshot.is_playing { ">" } else { " " };
    format!("[{bar}] {:>4} {marker} {caption}", layout.percent_label())
}
