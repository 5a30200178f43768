// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene definitions for title-card sequences.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a scene
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier for the scene at `index` (1-based)
    pub fn generate(index: usize) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("scene-{index}-{}", &suffix[..6]))
    }

    /// Identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Visual transition style used when a scene enters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnimationStyle {
    /// Cross-fade with a slight lift
    #[default]
    Fade,
    /// Slide in from below
    SlideUp,
    /// Slide in from the right
    SlideLeft,
    /// Scale up into place
    Zoom,
    /// Skewed jitter entrance
    Glitch,
    /// Bouncy scale with a small wobble
    Pop,
}

impl AnimationStyle {
    /// Display label shown in pickers and the preview header
    pub fn label(&self) -> &'static str {
        match self {
            AnimationStyle::Fade => "Cinematic Fade",
            AnimationStyle::SlideUp => "Slide Up",
            AnimationStyle::SlideLeft => "Slide Left",
            AnimationStyle::Zoom => "Dynamic Zoom",
            AnimationStyle::Glitch => "Neon Glitch",
            AnimationStyle::Pop => "Pop Bounce",
        }
    }

    /// Get all available styles
    pub fn all() -> &'static [AnimationStyle] {
        &[
            AnimationStyle::Fade,
            AnimationStyle::SlideUp,
            AnimationStyle::SlideLeft,
            AnimationStyle::Zoom,
            AnimationStyle::Glitch,
            AnimationStyle::Pop,
        ]
    }
}

/// One title card in a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Unique scene ID
    pub id: SceneId,
    /// Headline text
    pub title: String,
    /// Caption text
    pub subtitle: String,
    /// Seconds the scene stays live during playback
    pub duration: f32,
    /// Entrance transition
    #[serde(default)]
    pub animation: AnimationStyle,
    /// Accent color as a hex string
    pub accent_color: String,
    /// Headline size in pixels
    pub font_size: u32,
    /// Whether the headline gets an outline stroke
    #[serde(default)]
    pub stroke: bool,
}

impl Scene {
    /// Create a scene with default presentation attributes
    pub fn new(id: impl Into<SceneId>, title: impl Into<String>, duration: f32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: String::new(),
            duration,
            animation: AnimationStyle::default(),
            accent_color: "#38bdf8".to_string(),
            font_size: 64,
            stroke: false,
        }
    }

    /// Template used when the user adds a scene at position `index` (1-based)
    pub fn template(index: usize) -> Self {
        Self {
            id: SceneId::generate(index),
            title: "Neon Momentum".to_string(),
            subtitle: "Punchy opener with electrified typography and coated highlights."
                .to_string(),
            duration: 2.5,
            animation: AnimationStyle::SlideUp,
            accent_color: "#38bdf8".to_string(),
            font_size: 64,
            stroke: true,
        }
    }

    /// Set the caption
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    /// Set the entrance transition
    pub fn with_animation(mut self, animation: AnimationStyle) -> Self {
        self.animation = animation;
        self
    }

    /// Headline to display, with a placeholder for empty titles
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }
}
