//! Preview sidebar engine for a file-manager window slot.
//!
//! The slot hosts a directory view plus a preview pane that can render images
//! (including animated GIFs), text, the first page of a PDF, and audio/video
//! with transport controls. The core is single-threaded and event driven:
//! everything enters through [`slot::PreviewSlot::dispatch`].
//!
//! Backends are injected:
//! - timers through [`scheduler::Scheduler`]
//! - media playback through [`media::MediaBackend`]
//! - PDF rendering through [`preview::DocumentBackend`]
//! - widgets through the traits in [`surfaces`]
//!
//! Concrete GTK4, libmpv and pdfium implementations live behind the `gtk`,
//! `mpv` and `pdfium` cargo features.

pub mod config;
pub mod media;
pub mod models;
pub mod preview;
pub mod scheduler;
pub mod slot;
pub mod surfaces;

#[cfg(feature = "gtk")]
pub mod app;
#[cfg(feature = "gtk")]
pub mod ui;

#[cfg(test)]
mod testing;

pub use config::PreviewConfig;
pub use media::{MediaBackend, PipelineError, PipelineEvent, PipelineKind, PlaybackState};
pub use models::{Capabilities, FileLocation, FileRef, MimeClass};
pub use preview::{ActiveSurface, DocumentBackend, DocumentError, PreviewState};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TimerId};
pub use slot::{PreviewSlot, SlotBackends, SlotBindings, SlotEvent};
pub use surfaces::{
    Icon, ImageContent, PreviewSurfaces, SurfaceBinding, SurfaceKind, TransportControls,
    TransportGlyph, VideoHost, VideoSink,
};
