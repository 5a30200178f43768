// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline bar layout.
//!
//! Turns a scene list and the sequencer's snapshot into the proportions a
//! timeline widget draws: one segment per scene sized by duration, the active
//! segment flagged, and a fill bar for progress.

use crate::scene::{Scene, SceneId};
use crate::sequencer::PlaybackSnapshot;

/// One scene's slot on the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSegment {
    /// Scene this segment represents
    pub scene_id: SceneId,
    /// Label drawn inside the segment
    pub label: String,
    /// Share of the bar width in [0, 1]
    pub width: f32,
    /// Whether this is the active scene
    pub active: bool,
}

/// Computed timeline bar
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayout {
    /// Segments in playback order
    pub segments: Vec<TimelineSegment>,
    /// Progress fill width in [0, 1]
    pub fill: f32,
}

impl TimelineLayout {
    /// Lay out `scenes` for the given playback state
    pub fn new<'a>(scenes: impl IntoIterator<Item = &'a Scene>, snapshot: &PlaybackSnapshot) -> Self {
        let scenes: Vec<&Scene> = scenes.into_iter().collect();
        let total: f32 = scenes.iter().map(|s| s.duration).sum();

        let segments = scenes
            .iter()
            .map(|scene| TimelineSegment {
                scene_id: scene.id.clone(),
                label: if scene.title.is_empty() {
                    "Scene".to_string()
                } else {
                    scene.title.clone()
                },
                width: if total > 0.0 { scene.duration / total } else { 0.0 },
                active: snapshot.active_scene_id.as_ref() == Some(&scene.id),
            })
            .collect();

        Self {
            segments,
            fill: snapshot.progress.clamp(0.0, 1.0),
        }
    }

    /// Progress as a whole percentage, e.g. "42%"
    pub fn percent_label(&self) -> String {
        format!("{:.0}%", self.fill * 100.0)
    }

    /// Active segment, if any
    pub fn active_segment(&self) -> Option<&TimelineSegment> {
        self.segments.iter().find(|s| s.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_widths() {
        let scenes = vec![Scene::new("a", "Intro", 1.0), Scene::new("b", "", 3.0)];
        let snapshot = PlaybackSnapshot {
            is_playing: true,
            active_scene_id: Some("b".into()),
            progress: 0.5,
        };
        let layout = TimelineLayout::new(&scenes, &snapshot);

        assert_eq!(layout.segments.len(), 2);
        assert_eq!(layout.segments[0].width, 0.25);
        assert_eq!(layout.segments[1].width, 0.75);
        assert_eq!(layout.segments[1].label, "Scene");
        assert_eq!(layout.active_segment().unwrap().scene_id, SceneId::new("b"));
        assert_eq!(layout.percent_label(), "50%");
    }

    #[test]
    fn test_zero_total_duration() {
        let scenes = vec![Scene::new("a", "A", 0.0)];
        let layout = TimelineLayout::new(&scenes, &PlaybackSnapshot::default());
        assert_eq!(layout.segments[0].width, 0.0);
        assert!(layout.active_segment().is_none());
        assert_eq!(layout.percent_label(), "0%");
    }
}
