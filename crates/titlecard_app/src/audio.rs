// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio output for the preview.
//!
//! With the "audio" feature the transition cue plays through rodio. The
//! output stream lives on its own thread for as long as the context is open,
//! since it cannot move between threads.
//!
//! When the "audio" feature is not enabled, the null backend is used and the
//! tone generator logs once that sound is unavailable.

use std::sync::Arc;
use titlecard_sequencer::AudioBackend;

// ============================================================================
// Rodio Backend Implementation
// ============================================================================

#[cfg(feature = "audio")]
mod engine {
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use std::sync::mpsc;
    use std::thread::JoinHandle;
    use titlecard_sequencer::{AudioBackend, AudioError, OutputContext, VoiceBuffer, VoiceHandle};

    /// Opens the default output device through rodio
    #[derive(Debug, Default)]
    pub struct RodioBackend;

    impl AudioBackend for RodioBackend {
        fn open(&self) -> Result<Box<dyn OutputContext>, AudioError> {
            let (ready_tx, ready_rx) = mpsc::channel();
            let (close_tx, close_rx) = mpsc::channel::<()>();

            let thread = std::thread::Builder::new()
                .name("titlecard-audio".to_string())
                .spawn(move || match OutputStream::try_default() {
                    Ok((stream, handle)) => {
                        if ready_tx.send(Ok(handle)).is_err() {
                            return;
                        }
                        // Returns once the context closes and drops its sender.
                        let _ = close_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                    }
                })
                .map_err(|e| AudioError::Device(e.to_string()))?;

            match ready_rx.recv() {
                Ok(Ok(handle)) => Ok(Box::new(RodioContext {
                    handle,
                    close_tx: Some(close_tx),
                    thread: Some(thread),
                })),
                Ok(Err(reason)) => {
                    let _ = thread.join();
                    Err(AudioError::Unsupported(reason))
                }
                Err(_) => Err(AudioError::Device("audio thread exited".to_string())),
            }
        }
    }

    /// Live rodio output stream
    struct RodioContext {
        handle: OutputStreamHandle,
        close_tx: Option<mpsc::Sender<()>>,
        thread: Option<JoinHandle<()>>,
    }

    impl OutputContext for RodioContext {
        fn start_voice(&mut self, buffer: &VoiceBuffer) -> Result<Box<dyn VoiceHandle>, AudioError> {
            let sink = Sink::try_new(&self.handle).map_err(|e| AudioError::Device(e.to_string()))?;
            sink.append(SamplesBuffer::new(1, buffer.sample_rate, buffer.samples.to_vec()));
            Ok(Box::new(RodioVoice { sink }))
        }

        fn close(&mut self) {
            drop(self.close_tx.take());
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    tracing::warn!("Audio thread panicked during shutdown");
                }
            }
        }
    }

    impl Drop for RodioContext {
        fn drop(&mut self) {
            self.close();
        }
    }

    /// Rodio-backed output
    pub fn backend() -> std::sync::Arc<dyn AudioBackend> {
        tracing::info!("Audio backend: rodio");
        std::sync::Arc::new(RodioBackend)
    }

    /// One swoosh playing in its own sink
    struct RodioVoice {
        sink: Sink,
    }

    impl VoiceHandle for RodioVoice {
        fn stop(&mut self) -> Result<(), AudioError> {
            if self.sink.empty() {
                return Err(AudioError::Voice("voice already finished".to_string()));
            }
            self.sink.stop();
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.sink.empty()
        }
    }
}

// ============================================================================
// Stub Backend (without rodio)
// ============================================================================

#[cfg(not(feature = "audio"))]
mod engine {
    use std::sync::Arc;
    use titlecard_sequencer::{AudioBackend, NullBackend};

    /// Backend stub (no audio support)
    pub fn backend() -> Arc<dyn AudioBackend> {
        tracing::warn!("Audio backend: stub implementation (audio feature not enabled)");
        Arc::new(NullBackend)
    }
}

/// Backend the preview plays transition cues through
pub fn output_backend(muted: bool) -> Arc<dyn AudioBackend> {
    if muted {
        tracing::debug!("Sound muted; audio output will not be opened");
        return Arc::new(titlecard_sequencer::NullBackend);
    }
    engine::backend()
}
