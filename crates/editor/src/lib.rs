//! Montage Editor
//!
//! The interactive half of Montage: everything between user input and the
//! render engine.
//!
//! - **Controller:** clip list, selection, keyboard/click/scroll/drag
//!   handling, per-clip edits and playback state
//! - **Playback:** drives the controller through the timeline in real time,
//!   redrawing the preview and animating transitions at clip boundaries
//! - **Session:** owns the controller, media library, import queue and
//!   export pipeline for a front end

pub mod controller;
pub mod debounce;
pub mod input;
pub mod layout;
pub mod playback;
pub mod session;

pub use controller::{ControllerEffect, TimelineController, TEXT_GRAB_RADIUS_PCT};
pub use debounce::Debounce;
pub use input::{Direction, EditorInput, Key};
pub use layout::TimelineLayout;
pub use playback::{
    FrameCallback, MediaPlayback, PlaybackDriver, PlaybackOutcome, SharedController,
    TimedPlayback,
};
pub use session::EditorSession;
