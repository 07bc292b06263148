//! Media playback pipelines.
//!
//! A backend builds one [`Pipeline`] per previewed file; the
//! [`MediaPipelineController`] owns it together with its poll timer and keeps
//! the transport widgets in sync.

pub mod controller;
#[cfg(feature = "mpv")]
pub mod mpv;

pub use controller::{MediaPipelineController, PipelineNotice, PlaybackState};

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::surfaces::VideoSink;

/// The two independent pipeline instances of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Video,
    Audio,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Video => f.write_str("video"),
            PipelineKind::Audio => f.write_str("audio"),
        }
    }
}

/// Backend-level pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Inert; resources may be released.
    Null,
    Paused,
    Playing,
}

/// Asynchronous messages a pipeline reports (its "bus").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    EndOfStream,
    Error(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no media backend available")]
    BackendUnavailable,

    #[error("could not create playback element: {0}")]
    ElementCreation(String),

    #[error("could not create video sink: {0}")]
    SinkCreation(String),

    #[error("could not set media URI {uri}: {reason}")]
    UriAssignment { uri: String, reason: String },

    #[error("state change to {state:?} failed: {reason}")]
    StateChange { state: BackendState, reason: String },

    #[error("seek failed: {0}")]
    Seek(String),
}

/// Builds playback pipelines.
pub trait MediaBackend {
    /// Construct a pipeline for `uri`. The video kind must also produce a
    /// sink through [`Pipeline::video_sink`].
    fn create_pipeline(
        &self,
        kind: PipelineKind,
        uri: &str,
    ) -> Result<Box<dyn Pipeline>, PipelineError>;
}

/// One constructed source→decode→sink graph. Dropping it releases every
/// backend resource.
pub trait Pipeline {
    fn set_state(&mut self, state: BackendState) -> Result<(), PipelineError>;

    /// Current position, if the backend knows it.
    fn position(&self) -> Option<Duration>;

    /// Total duration, if the backend knows it.
    fn duration(&self) -> Option<Duration>;

    /// Flushing seek aligned to the nearest key unit.
    fn seek(&mut self, position: Duration) -> Result<(), PipelineError>;

    /// Messages posted since the last call.
    fn drain_events(&mut self) -> Vec<PipelineEvent>;

    /// Video output to embed; `None` for audio pipelines.
    fn video_sink(&self) -> Option<VideoSink>;
}
