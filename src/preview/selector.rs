//! Decides which preview surface shows a file and keeps every other surface
//! stopped.

use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::animation::AnimationController;
use super::document::{DocumentBackend, DocumentThumbnailer};
use super::raster::load_scaled;
use super::text::load_text_preview;
use crate::config::PreviewConfig;
use crate::media::{MediaBackend, MediaPipelineController, PipelineEvent, PipelineKind, PipelineNotice};
use crate::models::{classify, is_gif, Capabilities, FileRef, MimeClass};
use crate::scheduler::{Scheduler, TimerId};
use crate::surfaces::{Icon, ImageContent, PreviewSurfaces, SurfaceBinding, SurfaceKind};

/// The surface currently owning the pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveSurface {
    #[default]
    None,
    Image,
    Text,
    Video,
    Audio,
    Pdf,
}

/// Per-slot preview bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct PreviewState {
    pub active_surface: ActiveSurface,
    /// File whose preview is displayed; the content view owns it.
    pub current_file: Option<Weak<FileRef>>,
    pub visible: bool,
}

pub const NO_FILE_LABEL: &str = "No file selected";

pub fn selection_summary(count: usize) -> String {
    format!("{} items selected", count)
}

pub struct PreviewSurfaceSelector {
    config: PreviewConfig,
    surfaces: Rc<dyn PreviewSurfaces>,
    animation: AnimationController,
    video: MediaPipelineController,
    audio: MediaPipelineController,
    thumbnailer: Option<DocumentThumbnailer>,
    capabilities: Capabilities,
    state: PreviewState,
}

impl PreviewSurfaceSelector {
    pub fn new(
        config: PreviewConfig,
        scheduler: Rc<dyn Scheduler>,
        surfaces: Rc<dyn PreviewSurfaces>,
        video_binding: SurfaceBinding,
        audio_binding: SurfaceBinding,
        media: Option<Rc<dyn MediaBackend>>,
        documents: Option<Rc<dyn DocumentBackend>>,
    ) -> Self {
        let capabilities = Capabilities {
            media: media.is_some(),
            document: documents.is_some(),
        };
        let animation = AnimationController::new(
            scheduler.clone(),
            surfaces.clone(),
            config.min_frame_delay_ms,
        );
        let video = MediaPipelineController::new(
            PipelineKind::Video,
            media.clone(),
            scheduler.clone(),
            video_binding,
            config.poll_interval,
        );
        let audio = MediaPipelineController::new(
            PipelineKind::Audio,
            media,
            scheduler,
            audio_binding,
            config.poll_interval,
        );

        debug!(?capabilities, "Preview selector created");
        Self {
            config,
            surfaces,
            animation,
            video,
            audio,
            thumbnailer: documents.map(DocumentThumbnailer::new),
            capabilities,
            state: PreviewState::default(),
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn pipeline(&self, kind: PipelineKind) -> &MediaPipelineController {
        match kind {
            PipelineKind::Video => &self.video,
            PipelineKind::Audio => &self.audio,
        }
    }

    fn pipeline_mut(&mut self, kind: PipelineKind) -> &mut MediaPipelineController {
        match kind {
            PipelineKind::Video => &mut self.video,
            PipelineKind::Audio => &mut self.audio,
        }
    }

    /// Every controller has released its timer and backend objects.
    pub fn all_stopped(&self) -> bool {
        self.animation.is_stopped() && self.video.is_stopped() && self.audio.is_stopped()
    }

    /// Preview `file`, or clear the pane when there is none. Ignored while
    /// the pane is hidden.
    pub fn activate(&mut self, file: Option<&Rc<FileRef>>) {
        if !self.state.visible {
            return;
        }

        self.stop_all();

        let Some(file) = file else {
            self.surfaces.set_text("");
            self.surfaces.set_image(ImageContent::Clear);
            self.surfaces.set_label(NO_FILE_LABEL);
            self.surfaces.show(SurfaceKind::Empty);
            self.state.active_surface = ActiveSurface::None;
            self.state.current_file = None;
            return;
        };

        self.surfaces.set_label(file.display_name());
        self.state.current_file = Some(Rc::downgrade(file));

        let class = classify(file.mime_type(), self.capabilities);
        debug!(
            file = file.display_name(),
            mime = file.mime_type().unwrap_or("(none)"),
            ?class,
            "Activating preview"
        );

        self.state.active_surface = match class {
            MimeClass::Image => self.show_image(file),
            MimeClass::Text => self.show_text(file),
            MimeClass::Video => self.show_video(file),
            MimeClass::Audio => self.show_audio(file),
            MimeClass::Pdf => self.show_pdf(file),
            MimeClass::Other => {
                self.surfaces.show(SurfaceKind::Image);
                self.surfaces
                    .set_image(ImageContent::Icon(Icon::TextGeneric));
                ActiveSurface::Image
            }
        };
    }

    /// More than one file selected: only the label and the image slot change.
    pub fn show_selection_summary(&mut self, count: usize) {
        if !self.state.visible {
            return;
        }
        self.surfaces.set_image(ImageContent::Clear);
        self.surfaces.set_label(&selection_summary(count));
    }

    fn content_width(&self) -> i32 {
        self.config.content_width(self.surfaces.allocated_width())
    }

    fn show_image(&mut self, file: &FileRef) -> ActiveSurface {
        self.surfaces.show(SurfaceKind::Image);

        let Some(path) = file.local_path() else {
            self.surfaces
                .set_image(ImageContent::Icon(Icon::ImageGeneric));
            return ActiveSurface::Image;
        };

        let width = self.content_width();
        if is_gif(file.mime_type()) {
            self.animation.load(path, width);
            return ActiveSurface::Image;
        }

        let target = u32::try_from(width).unwrap_or(1);
        match load_scaled(path, target) {
            Ok(bitmap) => self.surfaces.set_image(ImageContent::Bitmap(bitmap)),
            Err(e) => {
                warn!("Failed to load preview for {}: {:#}", path.display(), e);
                self.surfaces
                    .set_image(ImageContent::Icon(Icon::ImageMissing));
            }
        }
        ActiveSurface::Image
    }

    fn show_text(&mut self, file: &FileRef) -> ActiveSurface {
        self.surfaces.show(SurfaceKind::Text);
        let text = load_text_preview(
            file.local_path(),
            self.config.text_max_bytes,
            &self.config.locale_codeset,
        );
        self.surfaces.set_text(&text);
        ActiveSurface::Text
    }

    fn show_video(&mut self, file: &FileRef) -> ActiveSurface {
        let uri = file.uri();
        if uri.is_empty() {
            warn!(file = file.display_name(), "Video has no URI");
            self.surfaces.show(SurfaceKind::VideoFallback);
            return ActiveSurface::Video;
        }

        self.surfaces.show(SurfaceKind::Video);
        if let Err(e) = self.video.start(uri) {
            warn!("Video preview unavailable for {}: {}", uri, e);
            self.surfaces.show(SurfaceKind::VideoFallback);
        }
        ActiveSurface::Video
    }

    fn show_audio(&mut self, file: &FileRef) -> ActiveSurface {
        self.surfaces.show(SurfaceKind::Audio);

        let uri = file.uri();
        if uri.is_empty() {
            warn!(file = file.display_name(), "Audio has no URI");
            return ActiveSurface::Audio;
        }

        if let Err(e) = self.audio.start(uri) {
            warn!("Audio preview unavailable for {}: {}", uri, e);
        }
        ActiveSurface::Audio
    }

    fn show_pdf(&mut self, file: &FileRef) -> ActiveSurface {
        self.surfaces.show(SurfaceKind::Pdf);

        let rendered = match (file.local_path(), &self.thumbnailer) {
            (Some(path), Some(thumbnailer)) => {
                match thumbnailer.render(path, self.surfaces.allocated_width(), &self.config) {
                    Ok(page) => Some(page),
                    Err(e) => {
                        warn!("Failed to render PDF preview for {}: {}", path.display(), e);
                        None
                    }
                }
            }
            _ => None,
        };

        let content = match rendered {
            Some(page) => ImageContent::Bitmap(page),
            None => ImageContent::Icon(Icon::ApplicationPdf),
        };
        self.surfaces.set_document_image(content);
        ActiveSurface::Pdf
    }

    /// Stop every surface's timers and pipelines.
    pub fn stop_all(&mut self) {
        self.animation.stop();
        self.video.stop();
        self.audio.stop();
        if self.state.active_surface == ActiveSurface::Pdf {
            self.surfaces.set_document_image(ImageContent::Clear);
        }
    }

    /// Route a timer firing. Returns `false` if no controller owns `id`.
    pub fn handle_timer(&mut self, id: TimerId) -> bool {
        if self.animation.handle_timer(id) {
            return true;
        }
        for kind in [PipelineKind::Video, PipelineKind::Audio] {
            let (handled, notice) = self.pipeline_mut(kind).handle_timer(id);
            if handled {
                if let Some(notice) = notice {
                    self.on_notice(kind, notice);
                }
                return true;
            }
        }
        debug!(%id, "Ignoring stale timer");
        false
    }

    pub fn toggle_playback(&mut self, kind: PipelineKind) {
        self.pipeline_mut(kind).toggle_playback();
    }

    pub fn seek(&mut self, kind: PipelineKind, percent: f64) {
        self.pipeline_mut(kind).seek(percent);
    }

    /// Bus message pushed by the backend.
    pub fn handle_pipeline_event(&mut self, kind: PipelineKind, event: PipelineEvent) {
        if let Some(notice) = self.pipeline_mut(kind).handle_event(event) {
            self.on_notice(kind, notice);
        }
    }

    fn on_notice(&mut self, kind: PipelineKind, notice: PipelineNotice) {
        let PipelineNotice::Failed(message) = notice;
        if kind == PipelineKind::Video && self.state.active_surface == ActiveSurface::Video {
            debug!("Switching to video fallback after error: {}", message);
            self.surfaces.show(SurfaceKind::VideoFallback);
        }
    }
}
