// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene playback for titlecard.
//!
//! This crate provides:
//! - Scene and storyboard model (ordered title cards, selection)
//! - Playback sequencer with cancellable timing
//! - Procedural swoosh tone for scene transitions
//! - Timeline layout for rendering progress
//!
//! ## Architecture
//!
//! The sequencer is built on:
//! - Tokio tasks for the scene walk and progress sampling
//! - Cancellation tokens and a tracked set of pending delays
//! - A watch channel carrying the observable playback state
//! - An audio output seam the tone generator plays through

pub mod cancel;
pub mod output;
pub mod scene;
pub mod sequencer;
pub mod settings;
pub mod storyboard;
pub mod synth;
pub mod timeline;
pub mod tone;

pub use cancel::{CancelToken, Cancelled, PendingDelays};
pub use output::{AudioBackend, AudioError, NullBackend, OutputContext, VoiceBuffer, VoiceHandle};
pub use scene::{AnimationStyle, Scene, SceneId};
pub use sequencer::{progress_ratio, PlaybackSnapshot, Sequencer};
pub use settings::{PlaybackSettings, SettingsError};
pub use storyboard::{Storyboard, StoryboardError};
pub use synth::{SwooshParams, SWOOSH};
pub use timeline::{TimelineLayout, TimelineSegment};
pub use tone::{ToneGenerator, TransitionCue, VoiceId};
