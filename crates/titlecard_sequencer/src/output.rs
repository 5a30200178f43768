// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio output seam.
//!
//! The tone generator talks to the host's audio device through these traits.
//! A backend opens an [`OutputContext`] (the expensive, long-lived part), and
//! the context starts one [`VoiceHandle`] per rendered buffer.

use std::sync::Arc;

/// Errors reported by audio backends
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The host has no usable audio output
    #[error("Audio output unsupported: {0}")]
    Unsupported(String),

    /// A suspended context could not be resumed
    #[error("Failed to resume audio context: {0}")]
    Resume(String),

    /// The output device rejected a request
    #[error("Audio device error: {0}")]
    Device(String),

    /// A voice could not be stopped (usually because it already finished)
    #[error("Voice error: {0}")]
    Voice(String),
}

/// Mono buffer ready for playback
#[derive(Debug, Clone)]
pub struct VoiceBuffer {
    /// Samples per second
    pub sample_rate: u32,
    /// Mono samples in [-1, 1]
    pub samples: Arc<[f32]>,
}

impl VoiceBuffer {
    /// Playback length in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// One playing sound
pub trait VoiceHandle: Send {
    /// Stop the voice immediately
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Whether the voice has played to the end or was stopped
    fn is_finished(&self) -> bool;
}

/// A live connection to an audio output device
pub trait OutputContext: Send {
    /// Whether the context is paused by the platform and needs a resume
    fn is_suspended(&self) -> bool {
        false
    }

    /// Resume a suspended context
    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    /// Start playing `buffer` now
    fn start_voice(&mut self, buffer: &VoiceBuffer) -> Result<Box<dyn VoiceHandle>, AudioError>;

    /// Release the device
    fn close(&mut self);
}

/// Factory for output contexts
pub trait AudioBackend: Send + Sync {
    /// Open a new output context.
    ///
    /// Returns [`AudioError::Unsupported`] when the host has no audio output.
    fn open(&self) -> Result<Box<dyn OutputContext>, AudioError>;
}

/// Backend for hosts without audio output
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn open(&self) -> Result<Box<dyn OutputContext>, AudioError> {
        Err(AudioError::Unsupported("no audio output available".to_string()))
    }
}
