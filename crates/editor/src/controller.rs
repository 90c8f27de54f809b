//! Timeline controller.
//!
//! Owns the editor state and turns user input (keys, clicks, scroll,
//! drag-and-drop, edit commands) into state changes. Side effects the host
//! has to carry out (redraw the preview, scroll the strip, show an alert)
//! are queued as [`ControllerEffect`]s and drained with
//! [`TimelineController::take_effects`].
//!
//! Every channel writes the same state; whichever input arrives last wins.

use std::time::Duration;

use montage_common::clock::format_timecode;
use montage_common::config::EditorDefaults;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{
    AudioRange, Clip, ClipId, ClipKind, EditorState, PercentPoint, PlaybackState, Rotation,
    SourceHandle, Timeline, TransitionKind, TrimRange,
};
use tokio::time::Instant;

use crate::debounce::Debounce;
use crate::input::{Direction, EditorInput, Key};
use crate::layout::TimelineLayout;

/// Radius, in percent of the canvas, within which a press grabs the text.
pub const TEXT_GRAB_RADIUS_PCT: f64 = 5.0;

/// Something the host should do in response to a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEffect {
    RefreshPreview,
    ScrollIntoView { index: usize, scroll_offset: f64 },
    PlaybackToggled { playing: bool },
    Alert(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    index: usize,
}

/// Mediates every mutation of [`EditorState`].
#[derive(Debug)]
pub struct TimelineController {
    state: EditorState,
    layout: TimelineLayout,
    scroll_settle: Debounce,
    drag: Option<DragState>,
    text_drag: bool,
    image_duration_secs: f64,
    trim_step_secs: f64,
    effects: Vec<ControllerEffect>,
}

impl Default for TimelineController {
    fn default() -> Self {
        Self::new(&EditorDefaults::default(), 1280.0)
    }
}

impl TimelineController {
    /// Create a controller for a timeline strip `viewport_width` pixels wide.
    pub fn new(config: &EditorDefaults, viewport_width: f64) -> Self {
        let mut state = EditorState::new();
        state.transition = config.transition.parse().unwrap_or_else(|e: String| {
            tracing::warn!(error = %e, "Ignoring configured transition");
            TransitionKind::None
        });
        Self {
            state,
            layout: TimelineLayout::from_config(config, viewport_width),
            scroll_settle: Debounce::new(Duration::from_millis(config.scroll_settle_ms)),
            drag: None,
            text_drag: false,
            image_duration_secs: config.image_duration_secs.max(0.0),
            trim_step_secs: if config.trim_step_secs > 0.0 {
                config.trim_step_secs
            } else {
                montage_project_model::TRIM_STEP_SECS
            },
            effects: Vec::new(),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Copy of the state for renderers and exporters.
    pub fn snapshot(&self) -> EditorState {
        self.state.clone()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.state.timeline
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.state.playback
    }

    pub fn layout(&self) -> &TimelineLayout {
        &self.layout
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected
    }

    pub fn selected_clip(&self) -> Option<&Clip> {
        self.state.selected.and_then(|i| self.state.timeline.get(i))
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_dragging_text(&self) -> bool {
        self.text_drag
    }

    /// `current / total` as `m:ss / m:ss`.
    pub fn time_display(&self) -> String {
        format!(
            "{} / {}",
            format_timecode(self.state.playback.current_time_secs),
            format_timecode(self.state.playback.total_duration_secs)
        )
    }

    /// Drain queued effects in the order they were produced.
    pub fn take_effects(&mut self) -> Vec<ControllerEffect> {
        std::mem::take(&mut self.effects)
    }

    fn emit(&mut self, effect: ControllerEffect) {
        self.effects.push(effect);
    }

    /// Turn a missing-input error into an alert effect and pass it on.
    fn alerting<T>(&mut self, result: MontageResult<T>) -> MontageResult<T> {
        if let Err(e @ MontageError::MissingInput { .. }) = &result {
            let message = e.to_string();
            self.emit(ControllerEffect::Alert(message));
        }
        result
    }

    // ---- media -------------------------------------------------------

    /// Append a clip. Stills get the configured display duration.
    pub fn import_clip(
        &mut self,
        kind: ClipKind,
        source: SourceHandle,
        name: impl Into<String>,
        media_duration_secs: f64,
    ) -> ClipId {
        let duration = match kind {
            ClipKind::Image => self.image_duration_secs,
            _ => media_duration_secs,
        };
        let name = name.into();
        let id = self.state.timeline.push(kind, source, name.clone(), duration);
        self.state.sync_after_timeline_change();
        tracing::info!(clip = %id, kind = kind.as_str(), name = %name, duration_secs = duration, "Clip added");
        self.emit(ControllerEffect::RefreshPreview);
        id
    }

    /// Remove a clip, keeping selection and playback indices pointed at the
    /// same neighbours.
    pub fn remove_clip(&mut self, id: ClipId) -> MontageResult<Clip> {
        let (clip, index) = self
            .state
            .timeline
            .remove(id)
            .map_err(|e| MontageError::missing_input(e.to_string()))?;

        self.state.selected = match self.state.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        let playback = &mut self.state.playback;
        if playback.current_clip_index > index {
            playback.current_clip_index -= 1;
            playback.current_time_secs =
                (playback.current_time_secs - clip.timeline_span_secs()).max(0.0);
        } else if playback.current_clip_index == index {
            playback.current_time_secs = self.state.timeline.start_of(index);
        }
        self.state.sync_after_timeline_change();
        tracing::info!(clip = %id, index, "Clip removed");
        self.emit(ControllerEffect::RefreshPreview);
        Ok(clip)
    }

    // ---- selection ---------------------------------------------------

    /// Move the selection one clip left or right, clamped to the timeline.
    /// Without a selection, movement starts from the first clip.
    pub fn navigate(&mut self, direction: Direction) -> Option<usize> {
        let len = self.state.timeline.len();
        if len == 0 {
            return None;
        }
        let base = self.state.selected.unwrap_or(0).min(len - 1);
        let index = match direction {
            Direction::Left => base.saturating_sub(1),
            Direction::Right => (base + 1).min(len - 1),
        };
        self.select_index(index);
        let scroll_offset = self.layout.scroll_into_view(index, len);
        self.emit(ControllerEffect::ScrollIntoView {
            index,
            scroll_offset,
        });
        Some(index)
    }

    /// Select the clip at `index`.
    pub fn select(&mut self, index: usize) -> MontageResult<()> {
        let len = self.state.timeline.len();
        if index >= len {
            return Err(MontageError::missing_input(format!(
                "No clip at position {index} (timeline has {len} clips)"
            )));
        }
        self.select_index(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.state.selected = None;
    }

    fn select_index(&mut self, index: usize) {
        self.state.selected = Some(index);
        self.state.playback.current_clip_index = index;
        self.state.playback.current_time_secs = self.state.timeline.start_of(index);
        tracing::debug!(index, "Clip selected");
        self.emit(ControllerEffect::RefreshPreview);
    }

    // ---- input channels ----------------------------------------------

    /// Apply one input event received at `now`.
    pub fn handle_input(&mut self, input: EditorInput, now: Instant) -> MontageResult<()> {
        match input {
            EditorInput::Key(key) => self.handle_key(key),
            EditorInput::Click { x } => {
                if let Some(index) = self.layout.hit_test(x, self.state.timeline.len()) {
                    self.select_index(index);
                }
                Ok(())
            }
            EditorInput::Scroll { offset } => {
                self.layout
                    .set_scroll_offset(offset, self.state.timeline.len());
                self.scroll_settle.arm(now);
                Ok(())
            }
            EditorInput::DragStart { index } => self.begin_drag(index),
            EditorInput::DragOver { pointer_x } => {
                self.drag_over(pointer_x);
                Ok(())
            }
            EditorInput::Drop | EditorInput::DragEnd => {
                self.end_drag();
                Ok(())
            }
        }
    }

    fn handle_key(&mut self, key: Key) -> MontageResult<()> {
        if self.state.timeline.is_empty() {
            return Ok(());
        }
        match key {
            Key::Left => {
                self.navigate(Direction::Left);
            }
            Key::Right => {
                self.navigate(Direction::Right);
            }
            Key::Enter | Key::Space => {
                self.toggle_play_pause()?;
            }
            Key::Other => {}
        }
        Ok(())
    }

    /// Fire timers that are due at `now`. Returns whether anything fired.
    pub fn poll_timers(&mut self, now: Instant) -> bool {
        if !self.scroll_settle.poll(now) {
            return false;
        }
        match self.layout.nearest_to_left_edge(self.state.timeline.len()) {
            Some(index) => {
                tracing::debug!(index, scroll = self.layout.scroll_offset(), "Scroll settled");
                self.select_index(index);
            }
            None => tracing::debug!("Scroll settled on empty timeline"),
        }
        true
    }

    /// Earliest pending timer deadline.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.scroll_settle.deadline()
    }

    // ---- drag and drop -----------------------------------------------

    pub fn begin_drag(&mut self, index: usize) -> MontageResult<()> {
        let len = self.state.timeline.len();
        if index >= len {
            return Err(MontageError::missing_input(format!(
                "No clip at position {index} to drag"
            )));
        }
        self.drag = Some(DragState { index });
        Ok(())
    }

    /// Move the dragged clip to the slot under the pointer. Returns its new
    /// index when it moved.
    pub fn drag_over(&mut self, pointer_x: f64) -> Option<usize> {
        let drag = self.drag?;
        let len = self.state.timeline.len();
        let target = self.layout.insertion_index(pointer_x, drag.index, len);
        if target == drag.index {
            return None;
        }

        let selected_id = self.selected_clip().map(|c| c.id);
        if self.state.timeline.move_clip(drag.index, target).is_err() {
            return None;
        }
        self.state.selected = selected_id.and_then(|id| self.state.timeline.index_of(id));
        self.drag = Some(DragState { index: target });
        Some(target)
    }

    /// Finish a drag (drop or cancel) and refresh the preview.
    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            tracing::debug!(order = ?self.state.timeline.ids(), "Drag finished");
            self.emit(ControllerEffect::RefreshPreview);
        }
    }

    // ---- clip edits --------------------------------------------------

    fn selected_mut(&mut self) -> MontageResult<&mut Clip> {
        let index = self.state.selected;
        let clip = index.and_then(|i| self.state.timeline.get_mut(i));
        clip.ok_or_else(|| MontageError::missing_input("Please select a clip first"))
    }

    /// Turn the selected clip a quarter clockwise.
    pub fn rotate_selected(&mut self) -> MontageResult<Rotation> {
        let result = self.selected_mut().map(Clip::rotate);
        let rotation = self.alerting(result)?;
        if let Some(index) = self.state.selected {
            self.state.playback.current_clip_index = index;
        }
        self.emit(ControllerEffect::RefreshPreview);
        Ok(rotation)
    }

    /// Trim the selected video. `start >= end` is pulled back to one step
    /// before `end`.
    pub fn trim_selected(&mut self, start: f64, end: f64) -> MontageResult<TrimRange> {
        let step = self.trim_step_secs;
        let result = self.selected_mut().and_then(|clip| {
            if clip.kind != ClipKind::Video {
                return Err(MontageError::unsupported("Only video clips can be trimmed"));
            }
            Ok(clip.set_trim(start, end, step))
        });
        let range = self.alerting(result)?;
        self.emit(ControllerEffect::RefreshPreview);
        Ok(range)
    }

    /// Set text overlay content and style on the selected clip.
    pub fn set_text_selected(
        &mut self,
        content: &str,
        color_hex: Option<&str>,
        size_px: Option<u32>,
    ) -> MontageResult<()> {
        let result = self
            .selected_mut()
            .map(|clip| clip.set_text(content, color_hex, size_px));
        self.alerting(result)?;
        self.emit(ControllerEffect::RefreshPreview);
        Ok(())
    }

    /// Start dragging the overlay if the press at (`x_pct`, `y_pct`) is on
    /// the selected clip's text.
    pub fn begin_text_drag(&mut self, x_pct: f64, y_pct: f64) -> MontageResult<bool> {
        let result = self.selected_mut().map(|clip| {
            clip.text.as_ref().is_some_and(|t| {
                t.position
                    .is_near(&PercentPoint { x: x_pct, y: y_pct }, TEXT_GRAB_RADIUS_PCT)
            })
        });
        let grabbed = self.alerting(result)?;
        self.text_drag = grabbed;
        Ok(grabbed)
    }

    /// Move the grabbed overlay. Ignored when no text drag is active.
    pub fn drag_text_to(&mut self, x_pct: f64, y_pct: f64) -> bool {
        if !self.text_drag {
            return false;
        }
        let moved = self
            .selected_mut()
            .map(|clip| clip.move_text(PercentPoint::new(x_pct, y_pct)))
            .unwrap_or(false);
        if moved {
            self.emit(ControllerEffect::RefreshPreview);
        }
        moved
    }

    pub fn end_text_drag(&mut self) {
        self.text_drag = false;
    }

    fn edit_audio(
        &mut self,
        edit: impl FnOnce(&mut Clip) -> Option<AudioRange>,
    ) -> MontageResult<AudioRange> {
        let result = self.selected_mut().and_then(|clip| {
            edit(clip).ok_or_else(|| MontageError::unsupported("Selected clip has no audio range"))
        });
        let range = self.alerting(result)?;
        self.state.sync_after_timeline_change();
        Ok(range)
    }

    pub fn set_audio_start(&mut self, start: f64) -> MontageResult<AudioRange> {
        self.edit_audio(|clip| clip.set_audio_start(start))
    }

    pub fn set_audio_end(&mut self, end: f64) -> MontageResult<AudioRange> {
        self.edit_audio(|clip| clip.set_audio_end(end))
    }

    pub fn set_audio_volume(&mut self, volume: f64) -> MontageResult<AudioRange> {
        self.edit_audio(|clip| clip.set_audio_volume(volume))
    }

    // ---- playback ----------------------------------------------------

    /// Flip between playing and paused. Playing past the end restarts from
    /// the first clip.
    pub fn toggle_play_pause(&mut self) -> MontageResult<bool> {
        if self.state.timeline.is_empty() {
            let result = Err(MontageError::missing_input("Please add media first"));
            return self.alerting(result);
        }
        let playing = !self.state.playback.is_playing;
        if playing && self.state.playback.current_clip_index >= self.state.timeline.len() {
            self.state.playback.rewind();
        }
        self.state.playback.is_playing = playing;
        tracing::debug!(playing, index = self.state.playback.current_clip_index, "Playback toggled");
        self.emit(ControllerEffect::PlaybackToggled { playing });
        Ok(playing)
    }

    /// Stop and rewind to the start.
    pub fn stop(&mut self) {
        let was_playing = self.state.playback.is_playing;
        self.state.playback.rewind();
        if was_playing {
            self.emit(ControllerEffect::PlaybackToggled { playing: false });
        }
        self.emit(ControllerEffect::RefreshPreview);
    }

    /// Jump to `fraction` of the total duration.
    pub fn seek(&mut self, fraction: f64) -> Option<usize> {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let total = self.state.timeline.total_duration_secs();
        self.state.playback.total_duration_secs = total;
        self.state.playback.current_time_secs = fraction * total;
        let index = self
            .state
            .timeline
            .locate(self.state.playback.current_time_secs);
        self.state.playback.current_clip_index = index.unwrap_or(0);
        self.emit(ControllerEffect::RefreshPreview);
        index
    }

    /// Called by the playback loop when the clip at `index` played out.
    /// Returns `false` when someone moved the playhead meanwhile.
    pub fn finish_clip(&mut self, index: usize) -> bool {
        if !self.state.playback.is_playing || self.state.playback.current_clip_index != index {
            return false;
        }
        let end = self.state.timeline.start_of(index)
            + self
                .state
                .timeline
                .get(index)
                .map(Clip::timeline_span_secs)
                .unwrap_or(0.0);
        self.state.playback.current_time_secs = end;
        self.state.playback.current_clip_index = index + 1;
        if self.state.playback.current_clip_index >= self.state.timeline.len() {
            self.stop();
        } else {
            self.emit(ControllerEffect::RefreshPreview);
        }
        true
    }

    /// Move the playhead to `clip_time_secs` into the clip at `index`,
    /// clamped to the clip's span. Ignored when another clip is current.
    /// Returns the playhead's timeline time.
    pub fn sync_playhead(&mut self, index: usize, clip_time_secs: f64) -> f64 {
        if self.state.playback.current_clip_index == index {
            let span = self
                .state
                .timeline
                .get(index)
                .map(Clip::timeline_span_secs)
                .unwrap_or(0.0);
            self.state.playback.current_time_secs =
                self.state.timeline.start_of(index) + clip_time_secs.clamp(0.0, span);
        }
        self.state.playback.current_time_secs
    }

    /// Abort playback after a media error.
    pub fn abort_playback(&mut self, reason: &MontageError) {
        tracing::warn!(error = %reason, "Playback aborted");
        if self.state.playback.is_playing {
            self.state.playback.is_playing = false;
            self.emit(ControllerEffect::PlaybackToggled { playing: false });
        }
    }

    pub fn set_transition(&mut self, kind: TransitionKind) {
        tracing::debug!(transition = %kind, "Transition selected");
        self.state.transition = kind;
    }

    pub fn transition(&self) -> TransitionKind {
        self.state.transition
    }

    /// Queue an alert for an error the user should see.
    pub fn report_error(&mut self, error: &MontageError) {
        self.emit(ControllerEffect::Alert(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn controller_with(kinds: &[(ClipKind, f64)]) -> TimelineController {
        let mut c = TimelineController::new(&EditorDefaults::default(), 400.0);
        for (i, (kind, duration)) in kinds.iter().enumerate() {
            c.import_clip(*kind, SourceHandle(i as u64), format!("clip{i}"), *duration);
        }
        c.take_effects();
        c
    }

    fn videos(n: usize) -> TimelineController {
        controller_with(&vec![(ClipKind::Video, 4.0); n])
    }

    #[test]
    fn test_import_image_uses_display_duration() {
        let mut c = TimelineController::default();
        c.import_clip(ClipKind::Image, SourceHandle(0), "a.png", 0.0);
        assert_eq!(c.timeline().len(), 1);
        assert_eq!(c.playback().total_duration_secs, 3.0);
        assert_eq!(c.take_effects(), vec![ControllerEffect::RefreshPreview]);
        assert_eq!(c.time_display(), "0:00 / 0:03");
    }

    #[test]
    fn test_navigate_clamps_at_both_ends() {
        let mut c = videos(3);
        for _ in 0..5 {
            c.navigate(Direction::Right);
        }
        assert_eq!(c.selected(), Some(2));
        assert_eq!(c.playback().current_clip_index, 2);
        for _ in 0..5 {
            c.navigate(Direction::Left);
        }
        assert_eq!(c.selected(), Some(0));
    }

    #[test]
    fn test_navigate_emits_scroll_and_refresh() {
        let mut c = videos(6);
        c.navigate(Direction::Right);
        let effects = c.take_effects();
        assert!(effects.contains(&ControllerEffect::RefreshPreview));
        assert!(matches!(
            effects.last(),
            Some(ControllerEffect::ScrollIntoView { index: 1, .. })
        ));
    }

    #[test]
    fn test_navigate_on_empty_timeline_is_noop() {
        let mut c = TimelineController::default();
        assert_eq!(c.navigate(Direction::Right), None);
        assert!(c.take_effects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_drive_selection_and_playback() {
        let mut c = videos(3);
        let now = Instant::now();
        c.handle_input(EditorInput::Key(Key::Right), now).unwrap();
        c.handle_input(EditorInput::Key(Key::Right), now).unwrap();
        assert_eq!(c.selected(), Some(2));
        c.handle_input(EditorInput::Key(Key::Space), now).unwrap();
        assert!(c.playback().is_playing);
        c.handle_input(EditorInput::Key(Key::Enter), now).unwrap();
        assert!(!c.playback().is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_selects_clip_and_ignores_gaps() {
        let mut c = videos(3);
        let now = Instant::now();
        // Default strip: 160 px clips with 8 px gaps.
        c.handle_input(EditorInput::Click { x: 200.0 }, now).unwrap();
        assert_eq!(c.selected(), Some(1));
        c.handle_input(EditorInput::Click { x: 164.0 }, now).unwrap();
        assert_eq!(c.selected(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_settles_once_after_quiet_period() {
        let mut c = videos(8);
        let start = Instant::now();
        c.handle_input(EditorInput::Scroll { offset: 300.0 }, start)
            .unwrap();
        c.handle_input(
            EditorInput::Scroll { offset: 340.0 },
            start + Duration::from_millis(100),
        )
        .unwrap();

        assert!(!c.poll_timers(start + Duration::from_millis(200)));
        assert_eq!(c.selected(), None);

        assert!(c.poll_timers(start + Duration::from_millis(250)));
        // Slot 2 starts at 336 px, the closest left edge to 340.
        assert_eq!(c.selected(), Some(2));
        assert!(!c.poll_timers(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_drag_moves_clip_and_keeps_selection_on_it() {
        let mut c = videos(4);
        let ids = c.timeline().ids();
        c.select(0).unwrap();
        c.begin_drag(0).unwrap();
        // Past the midpoint of slot 2 (416 px) but before slot 3's (584 px).
        assert_eq!(c.drag_over(500.0), Some(2));
        c.end_drag();

        assert_eq!(c.timeline().ids(), vec![ids[1], ids[2], ids[0], ids[3]]);
        assert_eq!(c.selected(), Some(2));
        assert!(!c.is_dragging());
        assert_eq!(c.take_effects().last(), Some(&ControllerEffect::RefreshPreview));
    }

    #[test]
    fn test_edits_without_selection_alert() {
        let mut c = videos(1);
        let err = c.rotate_selected().unwrap_err();
        assert!(matches!(err, MontageError::MissingInput { .. }));
        assert_eq!(
            c.take_effects(),
            vec![ControllerEffect::Alert("Please select a clip first".to_string())]
        );
        assert_eq!(c.timeline().get(0).unwrap().rotation, Rotation::NONE);
    }

    #[test]
    fn test_rotate_four_times_is_identity() {
        let mut c = videos(1);
        c.select(0).unwrap();
        let degrees: Vec<u16> = (0..4)
            .map(|_| c.rotate_selected().unwrap().degrees())
            .collect();
        assert_eq!(degrees, vec![90, 180, 270, 0]);
    }

    #[test]
    fn test_trim_inverted_range_is_coerced() {
        let mut c = controller_with(&[(ClipKind::Video, 10.0), (ClipKind::Image, 0.0)]);
        c.select(0).unwrap();
        let range = c.trim_selected(5.0, 5.0).unwrap();
        assert!((range.start - 4.9).abs() < 1e-9);
        assert_eq!(range.end, 5.0);

        c.select(1).unwrap();
        assert!(matches!(
            c.trim_selected(0.0, 1.0),
            Err(MontageError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_text_drag_requires_grab_near_text() {
        let mut c = videos(1);
        c.select(0).unwrap();
        c.set_text_selected("Hello", Some("#ff0000"), Some(32)).unwrap();

        assert!(!c.begin_text_drag(60.0, 50.0).unwrap());
        assert!(!c.drag_text_to(10.0, 10.0));

        assert!(c.begin_text_drag(53.0, 48.0).unwrap());
        assert!(c.drag_text_to(20.0, 80.0));
        c.end_text_drag();
        assert!(!c.drag_text_to(0.0, 0.0));

        let text = c.selected_clip().unwrap().text.clone().unwrap();
        assert_eq!(text.position, PercentPoint::new(20.0, 80.0));
        assert_eq!(text.color_hex, "#ff0000");
        assert_eq!(text.size_px, 32);
    }

    #[test]
    fn test_audio_edits_only_apply_to_audio() {
        let mut c = controller_with(&[(ClipKind::Audio, 10.0), (ClipKind::Image, 0.0)]);
        c.select(0).unwrap();
        c.set_audio_start(2.0).unwrap();
        let range = c.set_audio_end(6.0).unwrap();
        assert_eq!(range.duration_secs(), 4.0);
        assert_eq!(c.set_audio_volume(1.7).unwrap().volume, 1.0);

        c.select(1).unwrap();
        assert!(c.set_audio_volume(0.5).is_err());
    }

    #[test]
    fn test_seek_midpoint_of_equal_clips() {
        let mut c = videos(2);
        assert_eq!(c.seek(0.5), Some(1));
        assert_eq!(c.playback().current_time_secs, 4.0);
        assert_eq!(c.playback().current_clip_index, 1);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut c = videos(2);
        c.seek(0.75);
        c.toggle_play_pause().unwrap();
        c.stop();
        assert!(!c.playback().is_playing);
        assert_eq!(c.playback().current_clip_index, 0);
        assert_eq!(c.playback().current_time_secs, 0.0);
    }

    #[test]
    fn test_finish_last_clip_stops_playback() {
        let mut c = videos(2);
        c.toggle_play_pause().unwrap();
        assert!(c.finish_clip(0));
        assert_eq!(c.playback().current_clip_index, 1);
        assert_eq!(c.playback().current_time_secs, 4.0);
        assert!(!c.finish_clip(0));
        assert!(c.finish_clip(1));
        assert!(!c.playback().is_playing);
        assert_eq!(c.playback().current_clip_index, 0);
    }

    #[test]
    fn test_remove_keeps_indices_valid() {
        let mut c = videos(3);
        let ids = c.timeline().ids();
        c.select(2).unwrap();
        c.remove_clip(ids[0]).unwrap();
        assert_eq!(c.selected(), Some(1));
        assert_eq!(c.playback().current_clip_index, 1);
        assert_eq!(c.playback().total_duration_secs, 8.0);

        c.remove_clip(ids[2]).unwrap();
        assert_eq!(c.selected(), None);
        assert!(c.remove_clip(ids[2]).is_err());
    }

    #[test]
    fn test_remove_moves_playhead_with_timeline() {
        let mut c = videos(3);
        let ids = c.timeline().ids();
        c.select(2).unwrap();
        assert_eq!(c.sync_playhead(2, 1.0), 9.0);

        // An earlier clip goes: same spot in the same clip.
        c.remove_clip(ids[0]).unwrap();
        assert_eq!(c.playback().current_clip_index, 1);
        assert_eq!(c.playback().current_time_secs, 5.0);

        // The current clip goes: its successor starts from the top.
        c.select(0).unwrap();
        c.sync_playhead(0, 2.5);
        c.remove_clip(ids[1]).unwrap();
        assert_eq!(c.playback().current_clip_index, 0);
        assert_eq!(c.playback().current_time_secs, 0.0);
        assert_eq!(c.timeline().get(0).unwrap().id, ids[2]);
    }

    #[test]
    fn test_sync_playhead_clamps_to_clip_span() {
        let mut c = videos(2);
        c.select(1).unwrap();
        assert_eq!(c.sync_playhead(1, 10.0), 8.0);
        assert_eq!(c.sync_playhead(1, -1.0), 4.0);
        // Another clip is current: nothing moves.
        assert_eq!(c.sync_playhead(0, 2.0), 4.0);
    }

    #[test]
    fn test_toggle_on_empty_timeline_alerts() {
        let mut c = TimelineController::default();
        assert!(c.toggle_play_pause().is_err());
        assert!(matches!(c.take_effects().as_slice(), [ControllerEffect::Alert(_)]));
    }

    proptest! {
        #[test]
        fn prop_navigate_right_clamps(n in 1usize..20, k in 1usize..10) {
            let mut c = videos(n);
            for _ in 0..(n - 1 + k) {
                c.navigate(Direction::Right);
            }
            prop_assert_eq!(c.selected(), Some(n - 1));
        }

        #[test]
        fn prop_drag_is_permutation(n in 2usize..10, from in 0usize..10, xs in proptest::collection::vec(-200.0f64..2000.0, 1..6)) {
            let mut c = videos(n);
            let mut before = c.timeline().ids();
            c.begin_drag(from % n).unwrap();
            for x in xs {
                c.drag_over(x);
            }
            c.end_drag();
            let mut after = c.timeline().ids();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }
    }
}
