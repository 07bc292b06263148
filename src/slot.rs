//! The window slot: event routing, pane visibility and teardown.
//!
//! Everything that reaches the preview core arrives as a [`SlotEvent`] through
//! [`PreviewSlot::dispatch`]. The slot keeps the latest selection as weak
//! references so showing the pane again can re-render it.

use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::config::PreviewConfig;
use crate::media::{MediaBackend, PipelineEvent, PipelineKind};
use crate::models::FileRef;
use crate::preview::{DocumentBackend, PreviewState, PreviewSurfaceSelector};
use crate::scheduler::{Scheduler, TimerId};
use crate::surfaces::{PreviewSurfaces, SurfaceBinding};

/// Inbound events.
#[derive(Debug, Clone)]
pub enum SlotEvent {
    /// The content view's selection changed.
    SelectionChanged(Vec<Rc<FileRef>>),
    /// Pane chrome shows or hides the preview pane.
    VisibilityToggled(bool),
    TimerFired(TimerId),
    /// Play button clicked.
    PlayToggled(PipelineKind),
    /// User moved a seek range, 0–100.
    SeekRequested(PipelineKind, f64),
    /// Bus message from a push-style media backend.
    PipelineMessage(PipelineKind, PipelineEvent),
}

/// UI handles the slot hands to its controllers.
#[derive(Clone)]
pub struct SlotBindings {
    pub surfaces: Rc<dyn PreviewSurfaces>,
    pub video: SurfaceBinding,
    pub audio: SurfaceBinding,
}

/// Optional backends; a missing one disables its preview classes.
#[derive(Clone, Default)]
pub struct SlotBackends {
    pub media: Option<Rc<dyn MediaBackend>>,
    pub documents: Option<Rc<dyn DocumentBackend>>,
}

pub struct PreviewSlot {
    selector: PreviewSurfaceSelector,
    selection: Vec<Weak<FileRef>>,
    location: Option<Rc<FileRef>>,
    disposed: bool,
}

impl PreviewSlot {
    /// Build a slot with the preview pane hidden.
    pub fn new(
        config: PreviewConfig,
        scheduler: Rc<dyn Scheduler>,
        bindings: SlotBindings,
        backends: SlotBackends,
    ) -> Self {
        let selector = PreviewSurfaceSelector::new(
            config,
            scheduler,
            bindings.surfaces,
            bindings.video,
            bindings.audio,
            backends.media,
            backends.documents,
        );
        Self {
            selector,
            selection: Vec::new(),
            location: None,
            disposed: false,
        }
    }

    pub fn dispatch(&mut self, event: SlotEvent) {
        if self.disposed {
            debug!(?event, "Slot disposed, dropping event");
            return;
        }

        match event {
            SlotEvent::SelectionChanged(files) => {
                self.selection = files.iter().map(Rc::downgrade).collect();
                self.render_selection(&files);
            }
            SlotEvent::VisibilityToggled(visible) => self.set_preview_visible(visible),
            SlotEvent::TimerFired(id) => {
                self.selector.handle_timer(id);
            }
            SlotEvent::PlayToggled(kind) => self.selector.toggle_playback(kind),
            SlotEvent::SeekRequested(kind, percent) => self.selector.seek(kind, percent),
            SlotEvent::PipelineMessage(kind, message) => {
                self.selector.handle_pipeline_event(kind, message)
            }
        }
    }

    fn render_selection(&mut self, files: &[Rc<FileRef>]) {
        match files {
            [] => self.selector.activate(None),
            [file] => self.selector.activate(Some(file)),
            many => self.selector.show_selection_summary(many.len()),
        }
    }

    /// Show or hide the preview pane. Showing re-renders the last selection;
    /// hiding stops whatever was playing.
    pub fn set_preview_visible(&mut self, visible: bool) {
        if self.disposed || self.selector.state().visible == visible {
            return;
        }

        self.selector.set_visible(visible);
        debug!(visible, "Preview pane visibility changed");

        if visible {
            let files: Vec<Rc<FileRef>> = self.selection.iter().filter_map(Weak::upgrade).collect();
            self.render_selection(&files);
        } else {
            self.selector.stop_all();
        }
    }

    pub fn preview_visible(&self) -> bool {
        self.selector.state().visible
    }

    pub fn preview_state(&self) -> &PreviewState {
        self.selector.state()
    }

    pub fn selector(&self) -> &PreviewSurfaceSelector {
        &self.selector
    }

    /// Directory shown by the slot.
    pub fn set_location(&mut self, location: Rc<FileRef>) {
        if self.disposed {
            return;
        }
        debug!(uri = location.uri(), "Slot location changed");
        self.location = Some(location);
    }

    pub fn location(&self) -> Option<&Rc<FileRef>> {
        self.location.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stop every controller and release the location. Runs once; later
    /// calls and events are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.selector.stop_all();
        self.selection.clear();
        if let Some(location) = self.location.take() {
            debug!(uri = location.uri(), "Releasing slot location");
        }
        info!("Window slot disposed");
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.dispose();
    }
}
