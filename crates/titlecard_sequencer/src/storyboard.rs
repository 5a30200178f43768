// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editable scene list.
//!
//! The storyboard owns the ordered scenes and the user's selection. It is the
//! editing surface the sequencer reads from; nothing here touches playback.

use crate::scene::{AnimationStyle, Scene, SceneId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// Allowed scene lengths in seconds
pub const DURATION_RANGE: RangeInclusive<f32> = 1.0..=10.0;

/// Allowed headline sizes in pixels
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 36..=96;

/// Storyboard errors
#[derive(Debug, thiserror::Error)]
pub enum StoryboardError {
    /// No scene with this ID
    #[error("Scene not found: {0}")]
    SceneNotFound(SceneId),

    /// The last remaining scene cannot be removed
    #[error("A storyboard needs at least one scene")]
    LastScene,

    /// Duration outside [`DURATION_RANGE`]
    #[error("Invalid duration for {0}: {1}")]
    InvalidDuration(SceneId, f32),

    /// Font size outside [`FONT_SIZE_RANGE`]
    #[error("Invalid font size for {0}: {1}")]
    InvalidFontSize(SceneId, u32),

    /// Two scenes share an ID
    #[error("Duplicate scene ID: {0}")]
    DuplicateScene(SceneId),

    /// Storyboard file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storyboard file is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Result type for storyboard operations
pub type Result<T> = std::result::Result<T, StoryboardError>;

/// On-disk shape of a storyboard
#[derive(Debug, Deserialize, Serialize)]
struct StoryboardFile {
    scenes: Vec<Scene>,
    #[serde(default)]
    selected: Option<SceneId>,
}

/// Ordered scenes plus the current selection
#[derive(Debug, Clone)]
pub struct Storyboard {
    scenes: IndexMap<SceneId, Scene>,
    selected: Option<SceneId>,
}

impl Storyboard {
    /// Build a storyboard from scenes, validating each one.
    ///
    /// The first scene is selected.
    pub fn from_scenes(scenes: impl IntoIterator<Item = Scene>) -> Result<Self> {
        let mut map = IndexMap::new();
        for scene in scenes {
            validate(&scene)?;
            if map.contains_key(&scene.id) {
                return Err(StoryboardError::DuplicateScene(scene.id));
            }
            map.insert(scene.id.clone(), scene);
        }
        let selected = map.keys().next().cloned();
        Ok(Self { scenes: map, selected })
    }

    /// The three scenes a new project opens with
    pub fn starter() -> Self {
        let scenes = [
            Scene {
                id: SceneId::new("scene-1"),
                title: "Amplify Your Story".to_string(),
                subtitle: "Stack animated text layers, sync the sonic swoosh, and whip up viral-ready hooks in seconds.".to_string(),
                duration: 2.8,
                animation: AnimationStyle::Fade,
                accent_color: "#22d3ee".to_string(),
                font_size: 68,
                stroke: true,
            },
            Scene {
                id: SceneId::new("scene-2"),
                title: "Neon Velocity".to_string(),
                subtitle: "Slide into the beat with crystal typography, kinetic motion, and an instant energy burst.".to_string(),
                duration: 2.2,
                animation: AnimationStyle::SlideLeft,
                accent_color: "#38bdf8".to_string(),
                font_size: 62,
                stroke: false,
            },
            Scene {
                id: SceneId::new("scene-3"),
                title: "Impact Outro".to_string(),
                subtitle: "Glitch the finale, lock the message, and leave the audience craving the next cut.".to_string(),
                duration: 2.6,
                animation: AnimationStyle::Glitch,
                accent_color: "#f472b6".to_string(),
                font_size: 64,
                stroke: true,
            },
        ];
        let scenes = scenes.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            scenes,
            selected: Some(SceneId::new("scene-1")),
        }
    }

    /// Parse a storyboard from RON
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let file: StoryboardFile = ron::from_str(text)?;
        let mut storyboard = Self::from_scenes(file.scenes)?;
        if let Some(selected) = file.selected {
            storyboard.select(&selected)?;
        }
        Ok(storyboard)
    }

    /// Load a storyboard from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let storyboard = Self::from_ron_str(&text)?;
        tracing::info!("Loaded {} scenes from {}", storyboard.len(), path.display());
        Ok(storyboard)
    }

    /// Append a scene built from the template and select it
    pub fn add_scene(&mut self) -> SceneId {
        let scene = Scene::template(self.scenes.len() + 1);
        let id = scene.id.clone();
        self.scenes.insert(id.clone(), scene);
        self.selected = Some(id.clone());
        tracing::debug!("Added scene {}", id);
        id
    }

    /// Replace the attributes of scene `id`. The scene keeps its ID and position.
    pub fn update_scene(&mut self, id: &SceneId, mut scene: Scene) -> Result<()> {
        scene.id = id.clone();
        validate(&scene)?;
        let slot = self
            .scenes
            .get_mut(id)
            .ok_or_else(|| StoryboardError::SceneNotFound(id.clone()))?;
        *slot = scene;
        Ok(())
    }

    /// Remove scene `id`; the selection falls back to the first remaining scene
    pub fn remove_scene(&mut self, id: &SceneId) -> Result<Scene> {
        if !self.scenes.contains_key(id) {
            return Err(StoryboardError::SceneNotFound(id.clone()));
        }
        if self.scenes.len() == 1 {
            return Err(StoryboardError::LastScene);
        }
        let removed = self
            .scenes
            .shift_remove(id)
            .ok_or_else(|| StoryboardError::SceneNotFound(id.clone()))?;
        self.selected = self.scenes.keys().next().cloned();
        tracing::debug!("Removed scene {}", id);
        Ok(removed)
    }

    /// Select scene `id`
    pub fn select(&mut self, id: &SceneId) -> Result<()> {
        if !self.scenes.contains_key(id) {
            return Err(StoryboardError::SceneNotFound(id.clone()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    /// Selected scene ID
    pub fn selected(&self) -> Option<&SceneId> {
        self.selected.as_ref()
    }

    /// Get a scene
    pub fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// Scenes in playback order
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    /// Owned copy of the scenes in playback order
    pub fn to_vec(&self) -> Vec<Scene> {
        self.scenes.values().cloned().collect()
    }

    /// Get scene count
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether there are no scenes
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Sum of scene durations in seconds
    pub fn total_duration(&self) -> f32 {
        self.scenes.values().map(|s| s.duration).sum()
    }
}

impl Default for Storyboard {
    fn default() -> Self {
        Self::starter()
    }
}

fn validate(scene: &Scene) -> Result<()> {
    if !DURATION_RANGE.contains(&scene.duration) {
        return Err(StoryboardError::InvalidDuration(scene.id.clone(), scene.duration));
    }
    if !FONT_SIZE_RANGE.contains(&scene.font_size) {
        return Err(StoryboardError::InvalidFontSize(scene.id.clone(), scene.font_size));
    }
    Ok(())
}
