// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback sequencer.
//!
//! A playback run walks the scenes in order, holding each one live for its
//! duration, while a separate frame task samples overall progress against the
//! clock. Both tasks publish into a watch channel that rendering code
//! subscribes to.
//!
//! Every publication from a run task happens under the control mutex after
//! re-checking the run's [`CancelToken`]. [`Sequencer::stop`] cancels under
//! the same mutex, so once it returns nothing from the cancelled run can
//! touch the published state.

use crate::cancel::{CancelToken, PendingDelays};
use crate::scene::{Scene, SceneId};
use crate::settings::PlaybackSettings;
use crate::tone::TransitionCue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Observable playback state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    /// Whether a run is in progress
    pub is_playing: bool,
    /// Scene shown by the preview: the live scene while playing, the
    /// selection when idle
    pub active_scene_id: Option<SceneId>,
    /// Elapsed share of the run in [0, 1]
    pub progress: f32,
}

/// Progress ratio for `elapsed` out of `total`, clamped to [0, 1]
pub fn progress_ratio(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 0.0;
    }
    (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0) as f32
}

/// Selection the idle state falls back to
#[derive(Debug, Default)]
struct Control {
    selection: Option<SceneId>,
    first_scene: Option<SceneId>,
}

impl Control {
    fn restore_target(&self) -> Option<SceneId> {
        self.selection.clone().or_else(|| self.first_scene.clone())
    }
}

struct Shared {
    control: Mutex<Control>,
    state: watch::Sender<PlaybackSnapshot>,
    delays: PendingDelays,
}

impl Shared {
    /// Apply `update` unless `token` was cancelled. Returns false if skipped.
    fn publish(
        &self,
        token: &CancelToken,
        update: impl FnOnce(&mut PlaybackSnapshot, &Control),
    ) -> bool {
        let control = self.control.lock();
        if token.is_cancelled() {
            return false;
        }
        self.state.send_modify(|snapshot| update(snapshot, &control));
        true
    }
}

/// Tasks and tokens of one playback run
struct ActiveRun {
    token: CancelToken,
    frames: CancelToken,
    walk_task: JoinHandle<()>,
    frame_task: JoinHandle<()>,
}

/// Drives timed playback of a scene list
pub struct Sequencer {
    shared: Arc<Shared>,
    settings: PlaybackSettings,
    cue: Option<Arc<dyn TransitionCue>>,
    run: Option<ActiveRun>,
}

impl Sequencer {
    /// Create an idle sequencer
    pub fn new(settings: PlaybackSettings) -> Self {
        let (state, _) = watch::channel(PlaybackSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control::default()),
                state,
                delays: PendingDelays::new(),
            }),
            settings,
            cue: None,
            run: None,
        }
    }

    /// Fire `cue` on every scene transition when sound is enabled
    pub fn with_cue(mut self, cue: Arc<dyn TransitionCue>) -> Self {
        self.cue = Some(cue);
        self
    }

    /// Playback settings in use
    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Current playback state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.shared.state.subscribe()
    }

    /// Whether a run is in progress
    pub fn is_playing(&self) -> bool {
        self.shared.state.borrow().is_playing
    }

    /// Outstanding delays plus live run tasks
    pub fn pending_timers(&self) -> usize {
        let tasks = self.run.as_ref().map_or(0, |run| {
            usize::from(!run.walk_task.is_finished()) + usize::from(!run.frame_task.is_finished())
        });
        self.shared.delays.len() + tasks
    }

    /// Record the externally selected scene.
    ///
    /// While idle the selection is shown immediately; while playing it becomes
    /// the scene restored when the run ends.
    pub fn select(&mut self, scene_id: Option<SceneId>) {
        let mut control = self.shared.control.lock();
        control.selection = scene_id;
        let target = control.restore_target();
        self.shared.state.send_if_modified(|snapshot| {
            if snapshot.is_playing || snapshot.active_scene_id == target {
                return false;
            }
            snapshot.active_scene_id = target;
            true
        });
    }

    /// Forget the external selection; the run's first scene becomes the
    /// restore target
    pub fn clear_selection(&mut self) {
        self.select(None);
    }

    /// Currently recorded selection
    pub fn selection(&self) -> Option<SceneId> {
        self.shared.control.lock().selection.clone()
    }

    /// Start playback from the first scene.
    ///
    /// Returns false for an empty list, which changes nothing. A run that is
    /// already in progress is stopped first, so calling this while playing
    /// restarts from the top. Must be called within a Tokio runtime.
    pub fn start(&mut self, scenes: &[Scene], sound_enabled: bool) -> bool {
        let Some(first) = scenes.first() else {
            tracing::debug!("Ignoring playback request for an empty scene list");
            return false;
        };

        if self.run.is_some() {
            self.stop();
        }

        let steps: Vec<(SceneId, Duration)> = scenes
            .iter()
            .map(|scene| (scene.id.clone(), self.settings.scene_wait(scene.duration)))
            .collect();
        let total = steps
            .iter()
            .fold(Duration::ZERO, |total, (_, wait)| total.saturating_add(*wait));

        let token = CancelToken::new();
        let frames = CancelToken::new();
        {
            let mut control = self.shared.control.lock();
            control.first_scene = Some(first.id.clone());
            self.shared.state.send_modify(|snapshot| {
                snapshot.is_playing = true;
                snapshot.progress = 0.0;
            });
        }

        tracing::info!(
            "Playback started: {} scenes, {:.2}s total",
            steps.len(),
            total.as_secs_f32()
        );

        let frame_task = tokio::spawn(track_progress(
            Arc::clone(&self.shared),
            frames.clone(),
            Instant::now(),
            total,
            self.settings.frame_interval(),
        ));

        let cue = if sound_enabled { self.cue.clone() } else { None };
        let walk_task = tokio::spawn(walk_scenes(
            Arc::clone(&self.shared),
            token.clone(),
            frames.clone(),
            steps,
            cue,
            self.settings.completion_grace(),
        ));

        self.run = Some(ActiveRun {
            token,
            frames,
            walk_task,
            frame_task,
        });
        true
    }

    /// Stop playback and cancel everything the run scheduled.
    ///
    /// Idempotent: returns false when there was no run to stop.
    pub fn stop(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };

        {
            let control = self.shared.control.lock();
            run.token.cancel();
            run.frames.cancel();
            let abandoned = self.shared.delays.cancel_all();
            let target = control.restore_target();
            self.shared.state.send_modify(|snapshot| {
                snapshot.is_playing = false;
                snapshot.progress = 0.0;
                snapshot.active_scene_id = target;
            });
            tracing::debug!("Cancelled {} pending delays", abandoned);
        }

        run.walk_task.abort();
        run.frame_task.abort();
        tracing::info!("Playback stopped");
        true
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(PlaybackSettings::default())
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sample elapsed time once per frame until the run ends or progress is full
async fn track_progress(
    shared: Arc<Shared>,
    frames: CancelToken,
    started_at: Instant,
    total: Duration,
    frame_interval: Duration,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = frames.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let ratio = progress_ratio(started_at.elapsed(), total);
        let published = shared.publish(&frames, |snapshot, _| {
            snapshot.progress = snapshot.progress.max(ratio);
        });
        if !published || ratio >= 1.0 {
            return;
        }
    }
}

/// Hold each scene live for its wait, then finish and reset after `grace`
async fn walk_scenes(
    shared: Arc<Shared>,
    token: CancelToken,
    frames: CancelToken,
    steps: Vec<(SceneId, Duration)>,
    cue: Option<Arc<dyn TransitionCue>>,
    grace: Duration,
) {
    for (scene_id, wait) in steps {
        if token.is_cancelled() {
            return;
        }

        tracing::debug!("Scene {} live for {:.2}s", scene_id, wait.as_secs_f32());
        let published = shared.publish(&token, |snapshot, _| {
            snapshot.active_scene_id = Some(scene_id);
        });
        if !published {
            return;
        }

        if let Some(cue) = &cue {
            let cue = Arc::clone(cue);
            // Detached: the walk never waits on or hears back from the sound.
            drop(tokio::task::spawn_blocking(move || cue.play_cue()));
        }

        if shared.delays.delay(&token, wait).await.is_err() {
            return;
        }
    }

    frames.cancel();
    let finished = shared.publish(&token, |snapshot, _| {
        snapshot.is_playing = false;
        snapshot.progress = 1.0;
    });
    if !finished {
        return;
    }
    tracing::info!("Playback complete");

    if shared.delays.delay(&token, grace).await.is_err() {
        return;
    }
    shared.publish(&token, |snapshot, control| {
        snapshot.progress = 0.0;
        snapshot.active_scene_id = control.restore_target();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MAX_SCENE_WAIT;
    use tokio::sync::mpsc;

    /// Reports every cue on a channel
    struct ChannelCue {
        plays: mpsc::UnboundedSender<()>,
    }

    impl TransitionCue for ChannelCue {
        fn play_cue(&self) {
            let _ = self.plays.send(());
        }
    }

    fn channel_cue() -> (Arc<ChannelCue>, mpsc::UnboundedReceiver<()>) {
        let (plays, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelCue { plays }), rx)
    }

    fn scenes(entries: &[(&str, f32)]) -> Vec<Scene> {
        entries
            .iter()
            .map(|(id, duration)| Scene::new(*id, id.to_uppercase(), *duration))
            .collect()
    }

    async fn advance_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Append the active scene id if it changed since the last call
    fn record_active(rx: &mut watch::Receiver<PlaybackSnapshot>, log: &mut Vec<SceneId>) {
        if rx.has_changed().unwrap_or(false) {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.is_playing {
                if let Some(id) = snapshot.active_scene_id {
                    if log.last() != Some(&id) {
                        log.push(id);
                    }
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_scene_run() {
        let mut sequencer = Sequencer::default();
        sequencer.select(Some("a".into()));
        assert!(sequencer.start(&scenes(&[("a", 1.0), ("b", 1.0)]), false));

        advance_ms(1).await;
        let snapshot = sequencer.snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.active_scene_id, Some("a".into()));

        advance_ms(1000).await;
        assert_eq!(sequencer.snapshot().active_scene_id, Some("b".into()));
        assert!(sequencer.is_playing());

        advance_ms(1000).await;
        let snapshot = sequencer.snapshot();
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.progress, 1.0);

        advance_ms(500).await;
        let snapshot = sequencer.snapshot();
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(snapshot.active_scene_id, Some("a".into()));
        assert_eq!(sequencer.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_scene() {
        let mut sequencer = Sequencer::default();
        sequencer.select(Some("only".into()));
        let mut rx = sequencer.subscribe();
        sequencer.start(&scenes(&[("only", 2.0)]), false);

        advance_ms(500).await;
        assert!(sequencer.snapshot().progress > 0.0);
        assert!(sequencer.stop());

        let snapshot = sequencer.snapshot();
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(sequencer.pending_timers(), 0);

        rx.borrow_and_update();
        advance_ms(2500).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(sequencer.snapshot(), snapshot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop_restores_selection() {
        let mut sequencer = Sequencer::default();
        sequencer.select(Some("b".into()));
        sequencer.start(&scenes(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]), true);
        sequencer.stop();

        let snapshot = sequencer.snapshot();
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(snapshot.active_scene_id, Some("b".into()));
        assert_eq!(sequencer.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_selection_falls_back_to_first_scene() {
        let mut sequencer = Sequencer::default();
        sequencer.start(&scenes(&[("x", 1.0), ("y", 1.0)]), false);
        advance_ms(1500).await;
        sequencer.stop();
        assert_eq!(sequencer.snapshot().active_scene_id, Some("x".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_list_is_noop() {
        let mut sequencer = Sequencer::default();
        let before = sequencer.snapshot();
        assert!(!sequencer.start(&[], true));
        assert_eq!(sequencer.snapshot(), before);
        assert!(!sequencer.is_playing());
        assert_eq!(sequencer.pending_timers(), 0);
        assert!(!sequencer.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut sequencer = Sequencer::default();
        let mut rx = sequencer.subscribe();
        sequencer.start(&scenes(&[("a", 1.0)]), false);
        advance_ms(100).await;

        assert!(sequencer.stop());
        let after_first = sequencer.snapshot();
        rx.borrow_and_update();

        assert!(!sequencer.stop());
        assert!(!sequencer.stop());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(sequencer.snapshot(), after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_order_and_progress_monotonic() {
        let mut sequencer = Sequencer::default();
        let mut rx = sequencer.subscribe();
        let list = scenes(&[("one", 0.5), ("two", 0.25), ("three", 0.75), ("four", 0.5)]);
        sequencer.start(&list, false);

        let mut order = Vec::new();
        let mut last_progress = 0.0_f32;
        for _ in 0..200 {
            advance_ms(10).await;
            record_active(&mut rx, &mut order);
            let snapshot = sequencer.snapshot();
            if snapshot.is_playing {
                assert!(snapshot.progress >= last_progress);
                assert!(snapshot.progress <= 1.0);
                last_progress = snapshot.progress;
            }
        }

        let expected: Vec<SceneId> = list.iter().map(|s| s.id.clone()).collect();
        assert_eq!(order, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_tracks_elapsed_time() {
        let mut sequencer = Sequencer::default();
        sequencer.start(&scenes(&[("a", 2.0), ("b", 2.0)]), false);

        advance_ms(1000).await;
        let progress = sequencer.snapshot().progress;
        assert!((0.2..=0.26).contains(&progress), "progress {progress}");

        advance_ms(2000).await;
        let progress = sequencer.snapshot().progress;
        assert!((0.7..=0.76).contains(&progress), "progress {progress}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cue_fires_once_per_scene() {
        let (cue, mut plays) = channel_cue();
        let mut sequencer = Sequencer::default().with_cue(cue);
        sequencer.start(&scenes(&[("a", 0.2), ("b", 0.2), ("c", 0.2)]), true);

        advance_ms(1200).await;
        assert!(!sequencer.is_playing());
        for _ in 0..3 {
            assert_eq!(plays.recv().await, Some(()));
        }

        // The run is over, so no fourth cue can arrive.
        drop(sequencer);
        advance_ms(1000).await;
        assert!(plays.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_muted_run_skips_cue() {
        let (cue, mut plays) = channel_cue();
        let mut sequencer = Sequencer::default().with_cue(cue);
        sequencer.start(&scenes(&[("a", 0.2), ("b", 0.2)]), false);

        advance_ms(1000).await;
        assert!(!sequencer.is_playing());
        assert!(plays.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_while_playing() {
        let mut sequencer = Sequencer::default();
        let list = scenes(&[("a", 1.0), ("b", 1.0)]);
        sequencer.start(&list, false);
        advance_ms(1200).await;
        assert_eq!(sequencer.snapshot().active_scene_id, Some("b".into()));

        assert!(sequencer.start(&list, false));
        advance_ms(1).await;
        let snapshot = sequencer.snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.active_scene_id, Some("a".into()));
        assert!(snapshot.progress < 0.01);

        // The first run's timers are gone: "b" arrives on the new schedule.
        advance_ms(900).await;
        assert_eq!(sequencer.snapshot().active_scene_id, Some("a".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_degenerate_durations_are_clamped() {
        let mut sequencer = Sequencer::default();
        let mut rx = sequencer.subscribe();
        let list = scenes(&[("zero", 0.0), ("negative", -1.0), ("normal", 0.5)]);
        sequencer.start(&list, false);

        let mut order = Vec::new();
        for _ in 0..60 {
            advance_ms(5).await;
            record_active(&mut rx, &mut order);
        }
        assert_eq!(order.len(), 3);
        assert!(sequencer.is_playing());

        advance_ms(600).await;
        assert!(!sequencer.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_durations_are_capped() {
        let mut sequencer = Sequencer::default();
        assert!(sequencer.start(&scenes(&[("huge", 1.0e20)]), false));
        advance_ms(1).await;
        let snapshot = sequencer.snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.active_scene_id, Some("huge".into()));
        assert!(snapshot.progress < 0.01);
        assert!(sequencer.stop());

        assert!(sequencer.start(&scenes(&[("a", 1.0e19), ("b", 1.0e19)]), false));
        advance_ms(1000).await;
        let snapshot = sequencer.snapshot();
        assert_eq!(snapshot.active_scene_id, Some("a".into()));
        let expected = progress_ratio(Duration::from_secs(1), MAX_SCENE_WAIT * 2);
        assert!(snapshot.progress <= expected + f32::EPSILON);
        assert!(sequencer.stop());
        assert_eq!(sequencer.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_completion_grace() {
        let mut sequencer = Sequencer::default();
        sequencer.select(Some("b".into()));
        let mut rx = sequencer.subscribe();
        sequencer.start(&scenes(&[("a", 0.2), ("b", 0.2)]), false);

        advance_ms(450).await;
        let finished = sequencer.snapshot();
        assert!(!finished.is_playing);
        assert_eq!(finished.progress, 1.0);

        advance_ms(100).await;
        assert!(sequencer.stop());
        assert_eq!(sequencer.pending_timers(), 0);
        let stopped = sequencer.snapshot();
        assert_eq!(stopped.progress, 0.0);
        assert_eq!(stopped.active_scene_id, Some("b".into()));

        // The grace reset was cancelled with the run.
        rx.borrow_and_update();
        advance_ms(1000).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(sequencer.snapshot(), stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_run() {
        let mut sequencer = Sequencer::default();
        let mut rx = sequencer.subscribe();
        sequencer.start(&scenes(&[("a", 1.0), ("b", 1.0)]), false);
        advance_ms(300).await;

        drop(sequencer);
        rx.borrow_and_update();
        advance_ms(3000).await;
        // Sender is gone and nothing was published after teardown.
        assert!(rx.has_changed().is_err());
        assert!(!rx.borrow().is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_while_idle_updates_active() {
        let mut sequencer = Sequencer::default();
        sequencer.select(Some("c".into()));
        assert_eq!(sequencer.snapshot().active_scene_id, Some("c".into()));

        sequencer.start(&scenes(&[("a", 1.0)]), false);
        advance_ms(1).await;
        sequencer.select(Some("d".into()));
        assert_eq!(sequencer.snapshot().active_scene_id, Some("a".into()));

        sequencer.stop();
        assert_eq!(sequencer.snapshot().active_scene_id, Some("d".into()));

        sequencer.clear_selection();
        assert_eq!(sequencer.selection(), None);
        assert_eq!(sequencer.snapshot().active_scene_id, Some("a".into()));
    }

    #[test]
    fn test_progress_ratio() {
        assert_eq!(progress_ratio(Duration::from_secs(1), Duration::ZERO), 0.0);
        assert_eq!(progress_ratio(Duration::from_secs(1), Duration::from_secs(4)), 0.25);
        assert_eq!(progress_ratio(Duration::from_secs(9), Duration::from_secs(4)), 1.0);
    }
}
