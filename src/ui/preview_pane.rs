// Preview pane widgets and their surface bindings.

use std::cell::Cell;
use std::rc::Rc;

use gdk4::{MemoryFormat, MemoryTexture, Texture};
use gtk4::prelude::*;
use gtk4::{
    Align, Box as GtkBox, Button, ContentFit, IconLookupFlags, IconTheme, Image, Label,
    LinkButton, Orientation, Picture, PolicyType, Scale, ScrolledWindow, Stack,
    StackTransitionType, TextDirection, TextView, WrapMode,
};
use image::RgbaImage;

use crate::config::{video_help_uri, PreviewConfig};
use crate::surfaces::{
    ImageContent, PreviewSurfaces, SurfaceKind, TransportControls, TransportGlyph, VideoHost,
    VideoSink,
};

const ICON_PIXEL_SIZE: i32 = 128;

fn page_name(kind: SurfaceKind) -> &'static str {
    match kind {
        SurfaceKind::Empty | SurfaceKind::Image => "image",
        SurfaceKind::Text => "text",
        SurfaceKind::Video => "video",
        SurfaceKind::VideoFallback => "video-fallback",
        SurfaceKind::Audio => "audio",
        SurfaceKind::Pdf => "pdf",
    }
}

fn create_texture_from_rgba(image: &RgbaImage) -> Option<Texture> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let bytes = glib::Bytes::from(image.as_raw().as_slice());
    let texture = MemoryTexture::new(
        width as i32,
        height as i32,
        MemoryFormat::R8g8b8a8,
        &bytes,
        (width * 4) as usize,
    );
    Some(texture.upcast())
}

fn apply_content(picture: &Picture, content: ImageContent) {
    match content {
        ImageContent::Clear => picture.set_paintable(None::<&gdk4::Paintable>),
        ImageContent::Icon(icon) => {
            let theme = IconTheme::for_display(&picture.display());
            let paintable = theme.lookup_icon(
                icon.name(),
                &[],
                ICON_PIXEL_SIZE,
                picture.scale_factor(),
                TextDirection::None,
                IconLookupFlags::empty(),
            );
            picture.set_paintable(Some(&paintable));
        }
        ImageContent::Bitmap(bitmap) => match create_texture_from_rgba(&bitmap) {
            Some(texture) => picture.set_paintable(Some(&texture)),
            None => picture.set_paintable(None::<&gdk4::Paintable>),
        },
    }
}

fn build_picture() -> Picture {
    let picture = Picture::new();
    picture.set_can_shrink(true);
    picture.set_content_fit(ContentFit::ScaleDown);
    picture.set_valign(Align::Start);
    picture
}

fn scrolled(child: &impl IsA<gtk4::Widget>) -> ScrolledWindow {
    ScrolledWindow::builder()
        .hscrollbar_policy(PolicyType::Automatic)
        .vscrollbar_policy(PolicyType::Automatic)
        .vexpand(true)
        .child(child)
        .build()
}

/// Play button plus 0–100 seek scale.
pub struct GtkTransport {
    row: GtkBox,
    button: Button,
    scale: Scale,
    syncing: Rc<Cell<bool>>,
}

impl GtkTransport {
    fn new() -> Self {
        let row = GtkBox::new(Orientation::Horizontal, 6);
        let button = Button::from_icon_name(TransportGlyph::Play.icon_name());
        button.add_css_class("flat");

        let scale = Scale::with_range(Orientation::Horizontal, 0.0, 100.0, 1.0);
        scale.set_draw_value(false);
        scale.set_hexpand(true);

        row.append(&button);
        row.append(&scale);
        Self {
            row,
            button,
            scale,
            syncing: Rc::new(Cell::new(false)),
        }
    }

    pub fn widget(&self) -> &GtkBox {
        &self.row
    }

    pub fn connect_play<F: Fn() + 'static>(&self, callback: F) {
        self.button.connect_clicked(move |_| callback());
    }

    /// Only user-initiated changes reach `callback`.
    pub fn connect_seek<F: Fn(f64) + 'static>(&self, callback: F) {
        let syncing = self.syncing.clone();
        self.scale.connect_value_changed(move |scale| {
            if !syncing.get() {
                callback(scale.value());
            }
        });
    }
}

impl TransportControls for GtkTransport {
    fn set_glyph(&self, glyph: TransportGlyph) {
        self.button.set_icon_name(glyph.icon_name());
    }

    fn set_value_without_notify(&self, percent: f64) {
        self.syncing.set(true);
        self.scale.set_value(percent.clamp(0.0, 100.0));
        self.syncing.set(false);
    }
}

/// Container the backend's video widget is embedded into.
pub struct GtkVideoHost {
    container: GtkBox,
}

impl GtkVideoHost {
    fn new() -> Self {
        let container = GtkBox::new(Orientation::Vertical, 0);
        container.set_vexpand(true);
        container.set_size_request(-1, 180);
        Self { container }
    }

    fn remove_children(&self) {
        while let Some(child) = self.container.first_child() {
            self.container.remove(&child);
        }
    }
}

impl VideoHost for GtkVideoHost {
    fn replace_sink(&self, sink: &VideoSink) {
        self.remove_children();
        match sink.downcast_ref::<gtk4::Widget>() {
            Some(widget) => self.container.append(widget),
            None => tracing::warn!("Video sink is not a GTK widget"),
        }
    }

    fn clear_sink(&self) {
        self.remove_children();
    }
}

/// Title label over a stack with one page per surface.
pub struct PreviewPane {
    root: GtkBox,
    label: Label,
    stack: Stack,
    picture: Picture,
    text_view: TextView,
    pdf_picture: Picture,
    video_transport: Rc<GtkTransport>,
    audio_transport: Rc<GtkTransport>,
    video_host: Rc<GtkVideoHost>,
}

impl PreviewPane {
    pub fn new(config: &PreviewConfig) -> Rc<Self> {
        let root = GtkBox::new(Orientation::Vertical, 6);
        root.add_css_class("preview-pane");
        root.set_size_request(config.pane_min_width, -1);
        root.set_margin_start(config.pane_padding / 2);
        root.set_margin_end(config.pane_padding / 2);

        let label = Label::new(None);
        label.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
        label.add_css_class("heading");
        root.append(&label);

        let stack = Stack::new();
        stack.set_transition_type(StackTransitionType::Crossfade);
        stack.set_transition_duration(100);
        stack.set_vexpand(true);

        // image
        let picture = build_picture();
        stack.add_named(&scrolled(&picture), Some(page_name(SurfaceKind::Image)));

        // text
        let text_view = TextView::new();
        text_view.set_editable(false);
        text_view.set_cursor_visible(false);
        text_view.set_monospace(true);
        text_view.set_wrap_mode(WrapMode::WordChar);
        stack.add_named(&scrolled(&text_view), Some(page_name(SurfaceKind::Text)));

        // video
        let video_host = Rc::new(GtkVideoHost::new());
        let video_transport = Rc::new(GtkTransport::new());
        let video_box = GtkBox::new(Orientation::Vertical, 6);
        video_box.append(&video_host.container);
        video_box.append(video_transport.widget());
        stack.add_named(&video_box, Some(page_name(SurfaceKind::Video)));

        // video fallback banner
        let fallback = GtkBox::new(Orientation::Vertical, 12);
        fallback.set_valign(Align::Center);
        let fallback_icon = Image::from_icon_name("video-x-generic");
        fallback_icon.set_pixel_size(64);
        let fallback_label = Label::new(Some("Video preview unavailable."));
        fallback_label.set_wrap(true);
        fallback.append(&fallback_icon);
        fallback.append(&fallback_label);
        if let Some(uri) = video_help_uri() {
            let link = LinkButton::with_label(&uri, "Click here for setup instructions");
            fallback.append(&link);
        }
        stack.add_named(&fallback, Some(page_name(SurfaceKind::VideoFallback)));

        // audio
        let audio_transport = Rc::new(GtkTransport::new());
        let audio_box = GtkBox::new(Orientation::Vertical, 12);
        audio_box.set_valign(Align::Center);
        let audio_icon = Image::from_icon_name("audio-x-generic");
        audio_icon.set_pixel_size(96);
        audio_box.append(&audio_icon);
        audio_box.append(audio_transport.widget());
        stack.add_named(&audio_box, Some(page_name(SurfaceKind::Audio)));

        // pdf
        let pdf_picture = build_picture();
        stack.add_named(&scrolled(&pdf_picture), Some(page_name(SurfaceKind::Pdf)));

        stack.set_visible_child_name(page_name(SurfaceKind::Empty));
        root.append(&stack);
        root.set_visible(false);

        Rc::new(Self {
            root,
            label,
            stack,
            picture,
            text_view,
            pdf_picture,
            video_transport,
            audio_transport,
            video_host,
        })
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    pub fn video_transport(&self) -> Rc<GtkTransport> {
        self.video_transport.clone()
    }

    pub fn audio_transport(&self) -> Rc<GtkTransport> {
        self.audio_transport.clone()
    }

    pub fn video_host(&self) -> Rc<GtkVideoHost> {
        self.video_host.clone()
    }
}

impl PreviewSurfaces for PreviewPane {
    fn show(&self, kind: SurfaceKind) {
        self.stack.set_visible_child_name(page_name(kind));
    }

    fn set_label(&self, text: &str) {
        self.label.set_text(text);
    }

    fn set_image(&self, content: ImageContent) {
        apply_content(&self.picture, content);
    }

    fn set_text(&self, text: &str) {
        self.text_view.buffer().set_text(text);
    }

    fn set_document_image(&self, content: ImageContent) {
        apply_content(&self.pdf_picture, content);
    }

    fn allocated_width(&self) -> i32 {
        self.root.width()
    }
}
