//! Asynchronous playback loop.
//!
//! The driver walks the timeline from the playhead, waits for each clip's
//! media to finish, and hands a freshly composited preview frame to the
//! host. Video clips are redrawn on every frame tick; stills are drawn
//! once. Audio clips have no picture and are stepped over.
//!
//! Compositing runs on the blocking pool so decoding and rasterizing never
//! stall the runtime that also serves input. On every tick the driver
//! checks the controller: a cleared play flag pauses, and a playhead moved
//! by a seek, selection or removal restarts from the new position.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use montage_common::clock::FrameClock;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{Clip, ClipKind, TransitionKind};
use montage_render_engine::{
    AnimationStep, Canvas, MediaLibrary, MediaSource, PreviewRenderer, TransitionAnimator,
};
use tokio::sync::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::controller::TimelineController;

/// Controller shared between input handling and the playback loop.
pub type SharedController = Arc<Mutex<TimelineController>>;

/// Receives every composited frame.
pub type FrameCallback = Arc<dyn Fn(&Canvas) + Send + Sync>;

/// Plays a clip's media to completion.
#[async_trait]
pub trait MediaPlayback: Send + Sync {
    /// Resolve once `clip` finished playing from clip-local `start_secs`.
    async fn play(&self, clip: &Clip, start_secs: f64) -> MontageResult<()>;
}

/// Playback that simply waits out the clip's remaining duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedPlayback;

#[async_trait]
impl MediaPlayback for TimedPlayback {
    async fn play(&self, clip: &Clip, start_secs: f64) -> MontageResult<()> {
        let remaining = (clip.duration_secs() - start_secs.max(0.0)).max(0.0);
        if !remaining.is_finite() {
            return Err(MontageError::playback(format!(
                "{} has no usable duration",
                clip.name
            )));
        }
        tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
        Ok(())
    }
}

/// How a playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every clip played; the playhead was rewound.
    Finished,
    /// The user paused or stopped playback.
    Paused,
}

/// The clip under the playhead when playback of it started.
struct Cue {
    index: usize,
    clip: Clip,
    /// Clip-local start time.
    clip_time: f64,
    /// Timeline time last written to the controller.
    playhead: f64,
}

enum ClipEnd {
    /// Played out; carries the last frame for a transition.
    Next(Arc<RgbaImage>),
    /// Played out and was the final clip.
    Last,
    /// Paused or stopped mid-clip.
    Interrupted,
    /// Still playing, but the playhead was moved elsewhere.
    Restart,
}

/// What a frame tick found in the controller.
enum TickCheck {
    Unchanged,
    Paused,
    Moved,
}

/// Runs playback for a shared controller.
pub struct PlaybackDriver<P> {
    controller: SharedController,
    library: Arc<MediaLibrary>,
    renderer: PreviewRenderer,
    media: P,
    redraw: FrameClock,
    transition_duration: Duration,
    on_frame: Option<FrameCallback>,
}

impl<P: MediaPlayback> PlaybackDriver<P> {
    pub fn new(
        controller: SharedController,
        library: Arc<MediaLibrary>,
        renderer: PreviewRenderer,
        media: P,
    ) -> Self {
        Self {
            controller,
            library,
            renderer,
            media,
            redraw: FrameClock::new(60),
            transition_duration: montage_render_engine::transition::DEFAULT_TRANSITION_DURATION,
            on_frame: None,
        }
    }

    pub fn with_redraw_rate(mut self, hz: u32) -> Self {
        self.redraw = FrameClock::new(hz);
        self
    }

    pub fn with_transition_duration(mut self, duration: Duration) -> Self {
        self.transition_duration = duration;
        self
    }

    pub fn on_frame(mut self, callback: impl Fn(&Canvas) + Send + Sync + 'static) -> Self {
        self.on_frame = Some(Arc::new(callback));
        self
    }

    fn present(&self, canvas: &Canvas) {
        if let Some(cb) = &self.on_frame {
            cb(canvas);
        }
    }

    /// Play from the current playhead until the end or a pause.
    ///
    /// A media error stops playback and is returned.
    pub async fn run(&self) -> MontageResult<PlaybackOutcome> {
        let mut canvas = self.renderer.new_canvas();
        let mut previous: Option<Arc<RgbaImage>> = None;

        loop {
            let (cue, transition) = {
                let mut controller = self.controller.lock().await;
                let state = controller.state();
                if !state.playback.is_playing {
                    return Ok(PlaybackOutcome::Paused);
                }
                let index = state.playback.current_clip_index;
                let Some(clip) = state.timeline.get(index).cloned() else {
                    controller.stop();
                    return Ok(PlaybackOutcome::Finished);
                };
                let playhead = state.playback.current_time_secs;
                let clip_time = (playhead - state.timeline.start_of(index)).max(0.0);
                let transition = state.transition;
                if !clip.kind.is_visual() {
                    tracing::debug!(clip = %clip.id, "Skipping audio clip");
                    if controller.finish_clip(index) && !controller.playback().is_playing {
                        return Ok(PlaybackOutcome::Finished);
                    }
                    continue;
                }
                let cue = Cue {
                    index,
                    clip,
                    clip_time,
                    playhead,
                };
                (cue, transition)
            };

            match self
                .play_clip(&mut canvas, &cue, transition, previous.take())
                .await
            {
                Ok(ClipEnd::Next(last)) => previous = Some(last),
                Ok(ClipEnd::Last) => return Ok(PlaybackOutcome::Finished),
                Ok(ClipEnd::Interrupted) => return Ok(PlaybackOutcome::Paused),
                Ok(ClipEnd::Restart) => {
                    tracing::debug!(clip = %cue.clip.id, index = cue.index, "Playhead moved, restarting");
                }
                Err(e) => {
                    let mut controller = self.controller.lock().await;
                    controller.abort_playback(&e);
                    return Err(e);
                }
            }
        }
    }

    /// Play one clip to its end.
    async fn play_clip(
        &self,
        canvas: &mut Canvas,
        cue: &Cue,
        transition: TransitionKind,
        previous: Option<Arc<RgbaImage>>,
    ) -> MontageResult<ClipEnd> {
        let source = self.library.get(cue.clip.source);
        let mut playhead = cue.playhead;
        self.redraw(canvas, &cue.clip, source.clone(), cue.clip_time)
            .await?;

        let mut ticker = tokio::time::interval(self.redraw.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        match previous {
            Some(outgoing) if transition != TransitionKind::None => {
                if let Some(end) = self
                    .play_transition(canvas, cue, &mut playhead, &mut ticker, transition, outgoing)
                    .await?
                {
                    return Ok(end);
                }
            }
            _ => self.present(canvas),
        }

        let started = Instant::now();
        let finished = self.media.play(&cue.clip, cue.clip_time);
        tokio::pin!(finished);

        loop {
            tokio::select! {
                result = &mut finished => {
                    result?;
                    break;
                }
                _ = ticker.tick() => {
                    let clip_time = cue.clip_time + started.elapsed().as_secs_f64();
                    match self.check_tick(cue, &mut playhead, clip_time).await {
                        TickCheck::Unchanged => {}
                        TickCheck::Paused => return Ok(ClipEnd::Interrupted),
                        TickCheck::Moved => return Ok(ClipEnd::Restart),
                    }
                    if cue.clip.kind == ClipKind::Video {
                        self.redraw(canvas, &cue.clip, source.clone(), clip_time).await?;
                        self.present(canvas);
                    }
                }
            }
        }

        match self
            .check_tick(cue, &mut playhead, cue.clip.timeline_span_secs())
            .await
        {
            TickCheck::Unchanged => {}
            TickCheck::Paused => return Ok(ClipEnd::Interrupted),
            TickCheck::Moved => return Ok(ClipEnd::Restart),
        }
        let mut controller = self.controller.lock().await;
        if !controller.finish_clip(cue.index) {
            return Ok(ClipEnd::Restart);
        }
        tracing::debug!(clip = %cue.clip.id, index = cue.index, "Clip finished");
        if !controller.playback().is_playing {
            return Ok(ClipEnd::Last);
        }
        Ok(ClipEnd::Next(Arc::new(canvas.pixels().clone())))
    }

    /// Animate from `outgoing` into the frame already on `canvas`, one blend
    /// per tick. Returns early when the controller paused or moved.
    async fn play_transition(
        &self,
        canvas: &mut Canvas,
        cue: &Cue,
        playhead: &mut f64,
        ticker: &mut Interval,
        kind: TransitionKind,
        outgoing: Arc<RgbaImage>,
    ) -> MontageResult<Option<ClipEnd>> {
        let incoming = Arc::new(canvas.pixels().clone());
        let mut animator = TransitionAnimator::new(self.transition_duration);
        animator.trigger(kind, Instant::now());

        loop {
            let now = Instant::now();
            let (outgoing, incoming) = (outgoing.clone(), incoming.clone());
            let mut frame = take_canvas(canvas);
            let (frame, step, next) = off_runtime(move || {
                let step = animator.render(&mut frame, &outgoing, &incoming, now);
                (frame, step, animator)
            })
            .await?;
            *canvas = frame;
            animator = next;
            self.present(canvas);
            if step == AnimationStep::Finished {
                return Ok(None);
            }

            ticker.tick().await;
            match self.check_tick(cue, playhead, cue.clip_time).await {
                TickCheck::Unchanged => {}
                TickCheck::Paused => return Ok(Some(ClipEnd::Interrupted)),
                TickCheck::Moved => return Ok(Some(ClipEnd::Restart)),
            }
        }
    }

    /// Compare the controller with what this clip last wrote and, if
    /// nothing changed, advance its playhead to `clip_time`.
    async fn check_tick(&self, cue: &Cue, playhead: &mut f64, clip_time: f64) -> TickCheck {
        let mut controller = self.controller.lock().await;
        let playback = controller.playback();
        let is_playing = playback.is_playing;
        let same_clip = playback.current_clip_index == cue.index
            && controller.timeline().get(cue.index).map(|c| c.id) == Some(cue.clip.id);
        let moved = !same_clip || controller.playback().current_time_secs != *playhead;

        if !is_playing {
            if !moved {
                controller.sync_playhead(cue.index, clip_time);
            }
            return TickCheck::Paused;
        }
        if moved {
            return TickCheck::Moved;
        }
        *playhead = controller.sync_playhead(cue.index, clip_time);
        TickCheck::Unchanged
    }

    /// Composite `clip` at `clip_time` into `canvas` on the blocking pool.
    async fn redraw(
        &self,
        canvas: &mut Canvas,
        clip: &Clip,
        source: Option<Arc<dyn MediaSource>>,
        clip_time: f64,
    ) -> MontageResult<()> {
        let renderer = self.renderer.clone();
        let clip = clip.clone();
        let mut frame = take_canvas(canvas);
        let frame = off_runtime(move || {
            renderer
                .render_clip(&mut frame, Some(&clip), source.as_deref(), clip_time)
                .map(|()| frame)
        })
        .await??;
        *canvas = frame;
        Ok(())
    }
}

/// Move the canvas out, leaving a 1×1 placeholder.
fn take_canvas(canvas: &mut Canvas) -> Canvas {
    std::mem::replace(canvas, Canvas::new(1, 1))
}

async fn off_runtime<T, F>(task: F) -> MontageResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| MontageError::render(format!("Render task failed: {e}")))
}
