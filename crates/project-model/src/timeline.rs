//! The ordered clip sequence.
//!
//! Order in [`Timeline::clips`] is the only source of truth for playback
//! and export order. Reordering is a permutation: clips are moved, never
//! copied or dropped.

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipId, ClipKind, SourceHandle};

/// Errors raised by timeline edits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("Clip index {index} out of range (timeline has {len} clips)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Clip not found: {id}")]
    ClipNotFound { id: ClipId },
}

/// Ordered sequence of clips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    clips: Vec<Clip>,
    next_id: u64,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new clip and return its identity.
    pub fn push(
        &mut self,
        kind: ClipKind,
        source: SourceHandle,
        name: impl Into<String>,
        media_duration_secs: f64,
    ) -> ClipId {
        let id = ClipId(self.next_id);
        self.next_id += 1;
        self.clips
            .push(Clip::new(id, kind, source, name, media_duration_secs));
        id
    }

    /// Remove a clip by identity.
    pub fn remove(&mut self, id: ClipId) -> Result<(Clip, usize), TimelineError> {
        let index = self.index_of(id).ok_or(TimelineError::ClipNotFound { id })?;
        Ok((self.clips.remove(index), index))
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Clip> {
        self.clips.get_mut(index)
    }

    pub fn index_of(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    /// Clip identities in timeline order.
    pub fn ids(&self) -> Vec<ClipId> {
        self.clips.iter().map(|c| c.id).collect()
    }

    /// Move the clip at `from` so it ends up at index `to`.
    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<(), TimelineError> {
        let len = self.clips.len();
        if from >= len {
            return Err(TimelineError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(TimelineError::IndexOutOfRange { index: to, len });
        }
        if from != to {
            let clip = self.clips.remove(from);
            self.clips.insert(to, clip);
        }
        Ok(())
    }

    /// Total picture time of the timeline in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.clips.iter().map(Clip::timeline_span_secs).sum()
    }

    /// Timeline time at which the clip at `index` starts.
    pub fn start_of(&self, index: usize) -> f64 {
        self.clips
            .iter()
            .take(index)
            .map(Clip::timeline_span_secs)
            .sum()
    }

    /// Resolve a timeline time to the clip that covers it: the first clip
    /// whose accumulated end lies strictly after `time_secs`.
    ///
    /// Times at or beyond the end resolve to the last clip. Returns `None`
    /// for an empty timeline.
    pub fn locate(&self, time_secs: f64) -> Option<usize> {
        if self.clips.is_empty() {
            return None;
        }
        let mut accum = 0.0;
        for (index, clip) in self.clips.iter().enumerate() {
            accum += clip.timeline_span_secs();
            if accum > time_secs {
                return Some(index);
            }
        }
        Some(self.clips.len() - 1)
    }
}
