//! Time-based transitions between two frames.
//!
//! The animator is a two-state machine: [`TransitionAnimator::trigger`]
//! starts a transition, each [`TransitionAnimator::render`] call draws the
//! blend for the elapsed fraction, and the call that reaches the end draws
//! the incoming frame alone and returns to idle.

use std::time::Duration;

use image::{Rgba, RgbaImage};
use kurbo::Rect;
use montage_project_model::TransitionKind;
use tokio::time::Instant;

use crate::canvas::Canvas;

pub const DEFAULT_TRANSITION_DURATION: Duration = Duration::from_millis(1000);

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Outcome of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStep {
    /// Blend drawn at this progress in `[0, 1)`.
    Continue(f64),
    /// Incoming frame drawn at full opacity; animator is idle again.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AnimatorState {
    Idle,
    Animating { started: Instant },
}

/// Drives one transition at a time.
#[derive(Debug, Clone)]
pub struct TransitionAnimator {
    kind: TransitionKind,
    duration: Duration,
    state: AnimatorState,
}

impl Default for TransitionAnimator {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION_DURATION)
    }
}

impl TransitionAnimator {
    pub fn new(duration: Duration) -> Self {
        Self {
            kind: TransitionKind::None,
            duration: duration.max(Duration::from_millis(1)),
            state: AnimatorState::Idle,
        }
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, AnimatorState::Animating { .. })
    }

    /// Start a transition at `now`, replacing any running one.
    pub fn trigger(&mut self, kind: TransitionKind, now: Instant) {
        tracing::debug!(kind = %kind, "Transition triggered");
        self.kind = kind;
        self.state = AnimatorState::Animating { started: now };
    }

    /// Elapsed fraction at `now`, `None` when idle.
    pub fn progress(&self, now: Instant) -> Option<f64> {
        match self.state {
            AnimatorState::Idle => None,
            AnimatorState::Animating { started } => Some(
                now.saturating_duration_since(started).as_secs_f64() / self.duration.as_secs_f64(),
            ),
        }
    }

    /// Draw the frame for `now`.
    pub fn render(
        &mut self,
        canvas: &mut Canvas,
        outgoing: &RgbaImage,
        incoming: &RgbaImage,
        now: Instant,
    ) -> AnimationStep {
        match self.progress(now) {
            Some(progress) if progress < 1.0 => {
                compose_transition(canvas, self.kind, outgoing, incoming, progress);
                AnimationStep::Continue(progress)
            }
            _ => {
                compose_transition(canvas, TransitionKind::None, outgoing, incoming, 1.0);
                self.state = AnimatorState::Idle;
                AnimationStep::Finished
            }
        }
    }
}

/// Draw the `kind` blend of two canvas-sized frames at `progress`.
pub fn compose_transition(
    canvas: &mut Canvas,
    kind: TransitionKind,
    outgoing: &RgbaImage,
    incoming: &RgbaImage,
    progress: f64,
) {
    let p = progress.clamp(0.0, 1.0);
    let bounds = canvas.bounds();
    let (w, h) = (bounds.width(), bounds.height());

    canvas.clear();
    canvas.fill_rect(bounds, BLACK);

    match kind {
        TransitionKind::None => canvas.draw_image(incoming, bounds),
        TransitionKind::Fade => {
            canvas.save();
            canvas.set_global_alpha(1.0 - p);
            canvas.draw_image(outgoing, bounds);
            canvas.set_global_alpha(p);
            canvas.draw_image(incoming, bounds);
            canvas.restore();
        }
        TransitionKind::Slide => {
            canvas.draw_image(outgoing, Rect::new(-p * w, 0.0, -p * w + w, h));
            canvas.draw_image(incoming, Rect::new((1.0 - p) * w, 0.0, (1.0 - p) * w + w, h));
        }
        TransitionKind::Zoom => {
            let scale = 1.0 + p * 0.5;
            canvas.save();
            canvas.translate(w / 2.0, h / 2.0);
            canvas.scale(scale, scale);
            canvas.translate(-w / 2.0, -h / 2.0);
            canvas.draw_image(outgoing, bounds);
            canvas.restore();

            canvas.save();
            canvas.set_global_alpha(p);
            canvas.draw_image(incoming, bounds);
            canvas.restore();
        }
    }
}
