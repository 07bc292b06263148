//! Playback state machine shared by the video and audio previews.
//!
//! States: Stopped → (start) → Paused ⇄ Playing, any → (bus error) → Error.
//! A pipeline and its poll timer always come and go together.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{BackendState, MediaBackend, Pipeline, PipelineError, PipelineEvent, PipelineKind};
use crate::scheduler::{Scheduler, TimerHandle, TimerId};
use crate::surfaces::{SurfaceBinding, TransportGlyph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Paused,
    Playing,
    /// Torn down after a backend error; behaves like Stopped.
    Error,
}

/// Something the owner of the controller has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineNotice {
    /// The pipeline reported a runtime error and was torn down.
    Failed(String),
}

pub struct MediaPipelineController {
    kind: PipelineKind,
    backend: Option<Rc<dyn MediaBackend>>,
    scheduler: Rc<dyn Scheduler>,
    binding: SurfaceBinding,
    poll_interval: Duration,
    pipeline: Option<Box<dyn Pipeline>>,
    poll_timer: Option<TimerHandle>,
    state: PlaybackState,
}

impl MediaPipelineController {
    pub fn new(
        kind: PipelineKind,
        backend: Option<Rc<dyn MediaBackend>>,
        scheduler: Rc<dyn Scheduler>,
        binding: SurfaceBinding,
        poll_interval: Duration,
    ) -> Self {
        Self {
            kind,
            backend,
            scheduler,
            binding,
            poll_interval,
            pipeline: None,
            poll_timer: None,
            state: PlaybackState::Stopped,
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// No pipeline and no poll timer.
    pub fn is_stopped(&self) -> bool {
        self.pipeline.is_none() && self.poll_timer.is_none()
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn owns_timer(&self, id: TimerId) -> bool {
        self.poll_timer.as_ref().is_some_and(|t| t.id() == id)
    }

    /// Build a pipeline for `uri` and leave it paused on its first frame.
    ///
    /// Any running pipeline is torn down first. On failure nothing is kept
    /// and the controller stays stopped.
    pub fn start(&mut self, uri: &str) -> Result<(), PipelineError> {
        self.stop();

        let backend = self
            .backend
            .clone()
            .ok_or(PipelineError::BackendUnavailable)?;
        let mut pipeline = backend.create_pipeline(self.kind, uri)?;

        if self.kind == PipelineKind::Video {
            let Some(sink) = pipeline.video_sink() else {
                Self::release(self.kind, pipeline);
                return Err(PipelineError::SinkCreation(
                    "backend produced no video output".to_string(),
                ));
            };
            if let Some(host) = &self.binding.video_host {
                host.replace_sink(&sink);
            }
        }

        if let Err(e) = pipeline.set_state(BackendState::Paused) {
            Self::release(self.kind, pipeline);
            if let Some(host) = &self.binding.video_host {
                host.clear_sink();
            }
            return Err(e);
        }

        self.pipeline = Some(pipeline);
        self.state = PlaybackState::Paused;
        self.binding.transport.set_glyph(TransportGlyph::Play);
        self.binding.transport.set_value_without_notify(0.0);
        self.poll_timer = Some(self.scheduler.schedule_repeating(self.poll_interval));

        info!(kind = %self.kind, uri, "Pipeline started (paused)");
        Ok(())
    }

    /// Play ⇄ pause. No-op without a pipeline.
    pub fn toggle_playback(&mut self) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };

        let (target, next, glyph) = if self.state == PlaybackState::Playing {
            (
                BackendState::Paused,
                PlaybackState::Paused,
                TransportGlyph::Play,
            )
        } else {
            (
                BackendState::Playing,
                PlaybackState::Playing,
                TransportGlyph::Pause,
            )
        };

        match pipeline.set_state(target) {
            Ok(()) => {
                self.state = next;
                self.binding.transport.set_glyph(glyph);
                debug!(kind = %self.kind, state = ?next, "Playback toggled");
            }
            Err(e) => warn!(kind = %self.kind, "Could not toggle playback: {}", e),
        }
    }

    /// Seek to `percent` (0–100) of the duration. No-op while the duration is
    /// unknown or without a pipeline.
    pub fn seek(&mut self, percent: f64) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };
        let Some(duration) = pipeline.duration() else {
            return;
        };

        let fraction = if percent.is_finite() {
            (percent / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let position = duration.mul_f64(fraction);
        if let Err(e) = pipeline.seek(position) {
            warn!(kind = %self.kind, "Seek to {:?} failed: {}", position, e);
        }
    }

    /// Poll tick. Returns `false` when `id` is not this controller's timer.
    pub fn handle_timer(&mut self, id: TimerId) -> (bool, Option<PipelineNotice>) {
        if !self.owns_timer(id) {
            return (false, None);
        }
        (true, self.poll())
    }

    fn poll(&mut self) -> Option<PipelineNotice> {
        let events = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.drain_events(),
            None => return None,
        };
        for event in events {
            if let Some(notice) = self.handle_event(event) {
                return Some(notice);
            }
        }

        // The range widget may not be realized yet; try again next tick.
        if !self.binding.transport.has_seek_range() {
            return None;
        }

        let pipeline = self.pipeline.as_ref()?;
        if let (Some(position), Some(duration)) = (pipeline.position(), pipeline.duration()) {
            if !duration.is_zero() {
                let fraction = position.as_secs_f64() / duration.as_secs_f64();
                self.binding
                    .transport
                    .set_value_without_notify(fraction.clamp(0.0, 1.0) * 100.0);
            }
        }
        None
    }

    /// React to a bus message of the current pipeline.
    pub fn handle_event(&mut self, event: PipelineEvent) -> Option<PipelineNotice> {
        self.pipeline.as_ref()?;

        match event {
            PipelineEvent::EndOfStream => {
                if let Some(pipeline) = self.pipeline.as_mut() {
                    if let Err(e) = pipeline.seek(Duration::ZERO) {
                        warn!(kind = %self.kind, "Rewind after end of stream failed: {}", e);
                    }
                    if let Err(e) = pipeline.set_state(BackendState::Paused) {
                        warn!(kind = %self.kind, "Pause after end of stream failed: {}", e);
                    }
                }
                self.state = PlaybackState::Paused;
                self.binding.transport.set_glyph(TransportGlyph::Play);
                self.binding.transport.set_value_without_notify(0.0);
                debug!(kind = %self.kind, "End of stream, rewound");
                None
            }
            PipelineEvent::Error(message) => {
                error!(kind = %self.kind, "Playback error: {}", message);
                self.stop();
                self.state = PlaybackState::Error;
                Some(PipelineNotice::Failed(message))
            }
        }
    }

    /// Cancel the poll timer and release the pipeline. Safe to repeat.
    pub fn stop(&mut self) {
        if let Some(timer) = self.poll_timer.take() {
            self.scheduler.cancel(timer);
        }
        if let Some(pipeline) = self.pipeline.take() {
            Self::release(self.kind, pipeline);
            if let Some(host) = &self.binding.video_host {
                host.clear_sink();
            }
            info!(kind = %self.kind, "Pipeline stopped");
        }
        self.state = PlaybackState::Stopped;
        self.binding.transport.set_glyph(TransportGlyph::Play);
    }

    fn release(kind: PipelineKind, mut pipeline: Box<dyn Pipeline>) {
        if let Err(e) = pipeline.set_state(BackendState::Null) {
            warn!(kind = %kind, "Could not reset pipeline: {}", e);
        }
        drop(pipeline);
    }
}

impl Drop for MediaPipelineController {
    fn drop(&mut self) {
        // Only when the owner never stopped us.
        if !self.is_stopped() {
            self.stop();
        }
    }
}
