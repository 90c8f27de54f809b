//! Montage Render Engine
//!
//! Composites clips onto a fixed-size canvas for preview, animates
//! transitions between frames, and renders whole timelines into video
//! files.
//!
//! # Pipeline Architecture
//!
//! ```text
//! files ── MediaLibrary ──┐
//!                         ├── PreviewRenderer (letterbox, rotate, text)
//! timeline snapshot ──────┘         │
//!                                   ├── preview canvas
//!                                   │
//!                                   └── ExportPipeline (frame by frame)
//!                                               │
//!                                               ▼
//!                                    FrameSink (ffmpeg / PNG)
//!                                               │
//!                                               ▼
//!                                          output.mp4
//! ```

pub mod canvas;
pub mod compositor;
pub mod export;
pub mod ffmpeg;
pub mod media;
pub mod text;
pub mod transition;

pub use canvas::{parse_hex_color, Canvas};
pub use compositor::{source_time, PreviewRenderer};
pub use export::*;
pub use media::{
    mime_from_path, AudioTrack, FfmpegVideo, FrameSequence, MediaLibrary, MediaSource, StillImage,
};
pub use text::TextRenderer;
pub use transition::{compose_transition, AnimationStep, TransitionAnimator};
