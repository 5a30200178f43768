// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transition tone generator.
//!
//! Plays the swoosh cue through a lazily opened output context that is
//! reused for every invocation. All audio failures stop here: callers only
//! learn whether a voice was started.

use crate::output::{AudioBackend, AudioError, OutputContext, VoiceBuffer, VoiceHandle};
use crate::synth::{SwooshParams, SAMPLE_RATE, SWOOSH};
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that can be fired on every scene transition
pub trait TransitionCue: Send + Sync {
    /// Play the cue. Must not block for the length of the sound and must not fail.
    fn play_cue(&self);
}

/// Identifier of a voice started by a [`ToneGenerator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

impl VoiceId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

struct TrackedVoice {
    id: VoiceId,
    handle: Box<dyn VoiceHandle>,
}

/// Output state, created on first use
#[derive(Default)]
struct ToneState {
    context: Option<Box<dyn OutputContext>>,
    buffer: Option<VoiceBuffer>,
    voices: Vec<TrackedVoice>,
    next_voice: u64,
    unsupported: bool,
    released: bool,
}

/// Synthesizes and plays the swoosh cue
pub struct ToneGenerator {
    backend: Arc<dyn AudioBackend>,
    params: SwooshParams,
    state: Mutex<ToneState>,
}

impl ToneGenerator {
    /// Create a generator that opens its output context through `backend`
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            params: SWOOSH,
            state: Mutex::new(ToneState::default()),
        }
    }

    /// Start one swoosh voice.
    ///
    /// Returns `None` when no sound was scheduled: audio unavailable, resume
    /// failed, device error, or the generator was shut down.
    pub fn play(&self) -> Option<VoiceId> {
        match self.try_play() {
            Ok(voice) => voice,
            Err(e) => {
                tracing::debug!("Transition sound skipped: {}", e);
                None
            }
        }
    }

    fn try_play(&self) -> Result<Option<VoiceId>, AudioError> {
        let mut state = self.state.lock();
        if state.released || state.unsupported {
            return Ok(None);
        }

        if state.context.is_none() {
            match self.backend.open() {
                Ok(context) => {
                    tracing::info!("Audio output context opened");
                    state.context = Some(context);
                }
                Err(AudioError::Unsupported(reason)) => {
                    tracing::warn!("Audio output unavailable: {}. Transition sounds disabled.", reason);
                    state.unsupported = true;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        let buffer = state
            .buffer
            .get_or_insert_with(|| VoiceBuffer {
                sample_rate: SAMPLE_RATE,
                samples: self.params.render(SAMPLE_RATE).into(),
            })
            .clone();

        let Some(context) = state.context.as_mut() else {
            return Ok(None);
        };
        if context.is_suspended() {
            context.resume()?;
        }
        let handle = context.start_voice(&buffer)?;

        state.voices.retain(|voice| !voice.handle.is_finished());
        let id = VoiceId(state.next_voice);
        state.next_voice += 1;
        state.voices.push(TrackedVoice { id, handle });

        tracing::trace!("Started voice {}", id.0);
        Ok(Some(id))
    }

    /// Stop a single voice. Returns false if the voice is unknown or already done.
    pub fn stop_voice(&self, id: VoiceId) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.voices.iter().position(|v| v.id == id) else {
            return false;
        };
        let mut voice = state.voices.remove(index);
        if voice.handle.is_finished() {
            return false;
        }
        if let Err(e) = voice.handle.stop() {
            tracing::debug!("Failed to stop voice {}: {}", id.0, e);
        }
        true
    }

    /// Number of voices still sounding
    pub fn active_voices(&self) -> usize {
        let mut state = self.state.lock();
        state.voices.retain(|voice| !voice.handle.is_finished());
        state.voices.len()
    }

    /// Whether an output context is currently open
    pub fn has_context(&self) -> bool {
        self.state.lock().context.is_some()
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().released
    }

    /// Stop every voice and release the output context.
    ///
    /// Later calls to [`play`](Self::play) do nothing. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.released {
            return;
        }
        state.released = true;

        let voices = std::mem::take(&mut state.voices);
        let stopped = voices.len();
        for mut voice in voices {
            if let Err(e) = voice.handle.stop() {
                tracing::debug!("Failed to stop voice {}: {}", voice.id.0, e);
            }
        }

        if let Some(mut context) = state.context.take() {
            context.close();
            tracing::info!("Audio output context closed ({} voices stopped)", stopped);
        }
    }
}

impl Drop for ToneGenerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TransitionCue for ToneGenerator {
    fn play_cue(&self) {
        let _ = self.play();
    }
}
