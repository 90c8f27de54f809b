//! Editor state: what is selected and where playback stands.
//!
//! Selection and playback position are independent. Selection decides
//! which clip receives edits; playback decides which clip is shown.

use serde::{Deserialize, Serialize};

use crate::settings::TransitionKind;
use crate::timeline::Timeline;

/// Playback position over the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,

    /// Index of the clip being shown. Equal to the timeline length when
    /// playback ran past the end.
    pub current_clip_index: usize,

    pub current_time_secs: f64,
    pub total_duration_secs: f64,
}

impl PlaybackState {
    /// Stop and rewind to the first clip.
    pub fn rewind(&mut self) {
        self.is_playing = false;
        self.current_time_secs = 0.0;
        self.current_clip_index = 0;
    }

    /// Fraction of the timeline already played, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_duration_secs <= 0.0 {
            return 0.0;
        }
        (self.current_time_secs / self.total_duration_secs).clamp(0.0, 1.0)
    }

    /// Keep the clip index inside `[0, len]`.
    pub fn clamp_to(&mut self, len: usize) {
        self.current_clip_index = self.current_clip_index.min(len);
    }
}

/// Everything the editor owns. Renderers and exporters read snapshots of
/// this; only the timeline controller mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    pub timeline: Timeline,

    /// At most one selected clip.
    pub selected: Option<usize>,

    pub playback: PlaybackState,

    /// Transition used at clip boundaries during playback.
    pub transition: TransitionKind,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute derived fields after the timeline changed shape.
    pub fn sync_after_timeline_change(&mut self) {
        let len = self.timeline.len();
        self.playback.total_duration_secs = self.timeline.total_duration_secs();
        self.playback.clamp_to(len);
        self.selected = match self.selected {
            Some(_) if len == 0 => None,
            Some(index) => Some(index.min(len - 1)),
            None => None,
        };
    }
}
