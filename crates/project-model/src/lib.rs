//! Montage Project Model
//!
//! Defines the core data contracts for the editor:
//! - **Clip:** A timeline entry (image, video, or audio) with its edits
//! - **Timeline:** The ordered clip sequence that drives playback and export
//! - **State:** Playback position and selection owned by the editor
//! - **Settings:** Export parameters and transition modes
//!
//! Overlay positions are stored as percentages of the canvas so they
//! survive changes of output resolution.

pub mod clip;
pub mod geometry;
pub mod settings;
pub mod state;
pub mod timeline;

pub use clip::*;
pub use geometry::*;
pub use settings::*;
pub use state::*;
pub use timeline::*;
