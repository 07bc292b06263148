//! Test doubles shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use crate::media::{BackendState, MediaBackend, Pipeline, PipelineError, PipelineEvent, PipelineKind};
use crate::preview::{DocumentBackend, DocumentError, PagedDocument};
use crate::surfaces::{
    ImageContent, PreviewSurfaces, SurfaceKind, TransportControls, TransportGlyph, VideoHost,
    VideoSink,
};

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSurfaces {
    shown: RefCell<Vec<SurfaceKind>>,
    label: RefCell<String>,
    image: RefCell<ImageContent>,
    text: RefCell<String>,
    document: RefCell<ImageContent>,
    width: Cell<i32>,
}

impl RecordingSurfaces {
    pub fn with_width(width: i32) -> Self {
        let surfaces = Self::default();
        surfaces.width.set(width);
        surfaces
    }

    pub fn current(&self) -> Option<SurfaceKind> {
        self.shown.borrow().last().copied()
    }

    pub fn history(&self) -> Vec<SurfaceKind> {
        self.shown.borrow().clone()
    }

    pub fn label(&self) -> String {
        self.label.borrow().clone()
    }

    pub fn image(&self) -> ImageContent {
        self.image.borrow().clone()
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn document(&self) -> ImageContent {
        self.document.borrow().clone()
    }

    pub fn set_width(&self, width: i32) {
        self.width.set(width);
    }
}

impl PreviewSurfaces for RecordingSurfaces {
    fn show(&self, kind: SurfaceKind) {
        self.shown.borrow_mut().push(kind);
    }

    fn set_label(&self, text: &str) {
        *self.label.borrow_mut() = text.to_string();
    }

    fn set_image(&self, content: ImageContent) {
        *self.image.borrow_mut() = content;
    }

    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    fn set_document_image(&self, content: ImageContent) {
        *self.document.borrow_mut() = content;
    }

    fn allocated_width(&self) -> i32 {
        self.width.get()
    }
}

pub struct RecordingTransport {
    glyph: Cell<TransportGlyph>,
    value: Cell<f64>,
    has_range: Cell<bool>,
    notifications: Cell<usize>,
    glyph_sets: Cell<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            glyph: Cell::new(TransportGlyph::Play),
            value: Cell::new(0.0),
            has_range: Cell::new(true),
            notifications: Cell::new(0),
            glyph_sets: Cell::new(0),
        }
    }

    pub fn glyph(&self) -> TransportGlyph {
        self.glyph.get()
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// How often a value change would have reached the seek handler.
    pub fn notifications(&self) -> usize {
        self.notifications.get()
    }

    /// Every `set_glyph` call, including ones that keep the same glyph.
    pub fn glyph_sets(&self) -> usize {
        self.glyph_sets.get()
    }

    pub fn set_has_range(&self, has_range: bool) {
        self.has_range.set(has_range);
    }
}

impl TransportControls for RecordingTransport {
    fn set_glyph(&self, glyph: TransportGlyph) {
        self.glyph.set(glyph);
        self.glyph_sets.set(self.glyph_sets.get() + 1);
    }

    fn set_value_without_notify(&self, percent: f64) {
        if self.has_range.get() {
            self.value.set(percent);
        }
    }

    fn has_seek_range(&self) -> bool {
        self.has_range.get()
    }
}

#[derive(Default)]
pub struct RecordingVideoHost {
    attached: Cell<usize>,
    replacements: Cell<usize>,
}

impl RecordingVideoHost {
    /// Sinks currently embedded (0 or 1).
    pub fn attached(&self) -> usize {
        self.attached.get()
    }

    pub fn replacements(&self) -> usize {
        self.replacements.get()
    }
}

impl VideoHost for RecordingVideoHost {
    fn replace_sink(&self, _sink: &VideoSink) {
        self.attached.set(1);
        self.replacements.set(self.replacements.get() + 1);
    }

    fn clear_sink(&self) {
        self.attached.set(0);
    }
}

// ---------------------------------------------------------------------------
// Media backend
// ---------------------------------------------------------------------------

/// Where the fake backend should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailStage {
    /// Pipeline element cannot be created.
    Element,
    /// The video pipeline comes without a sink.
    Sink,
    /// URI is rejected after the pipeline was built.
    Uri,
    /// The initial transition to paused fails.
    Pause,
}

struct FakePipelineShared {
    kind: PipelineKind,
    uri: String,
    state: Cell<BackendState>,
    position: Cell<Option<Duration>>,
    duration: Cell<Option<Duration>>,
    seeks: RefCell<Vec<Duration>>,
    events: RefCell<VecDeque<PipelineEvent>>,
    fail_pause: bool,
}

/// Test-side view of a pipeline handed out by [`FakeMediaBackend`].
#[derive(Clone)]
pub struct FakePipelineProbe(Rc<FakePipelineShared>);

impl FakePipelineProbe {
    pub fn kind(&self) -> PipelineKind {
        self.0.kind
    }

    pub fn uri(&self) -> String {
        self.0.uri.clone()
    }

    pub fn state(&self) -> BackendState {
        self.0.state.get()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.0.seeks.borrow().clone()
    }

    pub fn set_position(&self, position: Option<Duration>) {
        self.0.position.set(position);
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        self.0.duration.set(duration);
    }

    /// Queue a bus message for the next poll.
    pub fn post(&self, event: PipelineEvent) {
        self.0.events.borrow_mut().push_back(event);
    }
}

struct FakePipeline {
    shared: Rc<FakePipelineShared>,
    destroys: Rc<Cell<usize>>,
    has_sink: bool,
}

impl Pipeline for FakePipeline {
    fn set_state(&mut self, state: BackendState) -> Result<(), PipelineError> {
        if state == BackendState::Paused && self.shared.fail_pause {
            return Err(PipelineError::StateChange {
                state,
                reason: "scripted failure".to_string(),
            });
        }
        self.shared.state.set(state);
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        self.shared.position.get()
    }

    fn duration(&self) -> Option<Duration> {
        self.shared.duration.get()
    }

    fn seek(&mut self, position: Duration) -> Result<(), PipelineError> {
        self.shared.seeks.borrow_mut().push(position);
        self.shared.position.set(Some(position));
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.shared.events.borrow_mut().drain(..).collect()
    }

    fn video_sink(&self) -> Option<VideoSink> {
        (self.shared.kind == PipelineKind::Video && self.has_sink)
            .then(|| VideoSink::new(self.shared.uri.clone()))
    }
}

impl Drop for FakePipeline {
    fn drop(&mut self) {
        self.destroys.set(self.destroys.get() + 1);
    }
}

/// Counts pipeline constructions and destructions.
#[derive(Default)]
pub struct FakeMediaBackend {
    creates: Cell<usize>,
    destroys: Rc<Cell<usize>>,
    fail: Cell<Option<FailStage>>,
    pipelines: RefCell<Vec<FakePipelineProbe>>,
}

impl FakeMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_at(&self, stage: Option<FailStage>) {
        self.fail.set(stage);
    }

    pub fn creates(&self) -> usize {
        self.creates.get()
    }

    pub fn destroys(&self) -> usize {
        self.destroys.get()
    }

    /// Most recently constructed pipeline.
    pub fn last(&self) -> Option<FakePipelineProbe> {
        self.pipelines.borrow().last().cloned()
    }
}

impl MediaBackend for FakeMediaBackend {
    fn create_pipeline(
        &self,
        kind: PipelineKind,
        uri: &str,
    ) -> Result<Box<dyn Pipeline>, PipelineError> {
        let fail = self.fail.get();
        if fail == Some(FailStage::Element) {
            return Err(PipelineError::ElementCreation("playbin".to_string()));
        }

        let shared = Rc::new(FakePipelineShared {
            kind,
            uri: uri.to_string(),
            state: Cell::new(BackendState::Null),
            position: Cell::new(None),
            duration: Cell::new(None),
            seeks: RefCell::new(Vec::new()),
            events: RefCell::new(VecDeque::new()),
            fail_pause: fail == Some(FailStage::Pause),
        });
        let pipeline = FakePipeline {
            shared: shared.clone(),
            destroys: self.destroys.clone(),
            has_sink: fail != Some(FailStage::Sink),
        };
        self.creates.set(self.creates.get() + 1);
        self.pipelines.borrow_mut().push(FakePipelineProbe(shared));

        if fail == Some(FailStage::Uri) {
            drop(pipeline);
            return Err(PipelineError::UriAssignment {
                uri: uri.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(Box::new(pipeline))
    }
}

// ---------------------------------------------------------------------------
// Document backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentScript {
    OpenFails,
    Pages {
        count: usize,
        width: f64,
        height: f64,
    },
    RenderFails,
}

pub struct FakeDocumentBackend {
    script: RefCell<DocumentScript>,
    opened: RefCell<Vec<PathBuf>>,
    scales: Rc<RefCell<Vec<f64>>>,
}

impl FakeDocumentBackend {
    pub fn new(script: DocumentScript) -> Self {
        Self {
            script: RefCell::new(script),
            opened: RefCell::new(Vec::new()),
            scales: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn set_script(&self, script: DocumentScript) {
        *self.script.borrow_mut() = script;
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }

    pub fn scales(&self) -> Vec<f64> {
        self.scales.borrow().clone()
    }
}

struct FakeDocument {
    count: usize,
    width: f64,
    height: f64,
    fail_render: bool,
    scales: Rc<RefCell<Vec<f64>>>,
}

impl PagedDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.count
    }

    fn page_size(&self, index: usize) -> Result<(f64, f64), DocumentError> {
        if index >= self.count {
            return Err(DocumentError::NoPages);
        }
        Ok((self.width, self.height))
    }

    fn render_page(&self, _index: usize, scale: f64) -> Result<RgbaImage, DocumentError> {
        self.scales.borrow_mut().push(scale);
        if self.fail_render {
            return Err(DocumentError::Render("scripted failure".to_string()));
        }
        let width = (self.width * scale).round() as u32;
        let height = (self.height * scale).round() as u32;
        Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }
}

impl DocumentBackend for FakeDocumentBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument + '_>, DocumentError> {
        self.opened.borrow_mut().push(path.to_path_buf());
        let document = match self.script.borrow().clone() {
            DocumentScript::OpenFails => {
                return Err(DocumentError::Open {
                    path: path.to_path_buf(),
                    reason: "not a PDF".to_string(),
                })
            }
            DocumentScript::Pages {
                count,
                width,
                height,
            } => FakeDocument {
                count,
                width,
                height,
                fail_render: false,
                scales: self.scales.clone(),
            },
            DocumentScript::RenderFails => FakeDocument {
                count: 1,
                width: 612.0,
                height: 792.0,
                fail_render: true,
                scales: self.scales.clone(),
            },
        };
        Ok(Box::new(document))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Write an animated GIF with one solid frame per entry of `delays_ms`.
pub fn write_gif(path: &Path, width: u32, height: u32, delays_ms: &[u32], repeat: Option<u16>) {
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame};

    let file = std::fs::File::create(path).expect("create gif");
    let mut encoder = GifEncoder::new(file);
    if let Some(count) = repeat {
        let repeat = if count == 0 {
            Repeat::Infinite
        } else {
            Repeat::Finite(count)
        };
        encoder.set_repeat(repeat).expect("set repeat");
    }
    for (i, delay) in delays_ms.iter().enumerate() {
        let shade = (i as u8).wrapping_mul(80);
        let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 0, 255 - shade, 255]));
        let frame = Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(*delay, 1));
        encoder.encode_frame(frame).expect("encode frame");
    }
}

/// Write a solid PNG.
pub fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
        .save(path)
        .expect("save png");
}
