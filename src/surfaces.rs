//! Outbound UI binding.
//!
//! The core never owns widgets. It talks to the pane through these traits;
//! implementations hold their widgets and use interior mutability, so every
//! method takes `&self` and bindings are shared as `Rc<dyn ...>`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use image::RgbaImage;

/// The mutually exclusive preview renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Image surface with nothing in it; the resting state.
    Empty,
    Image,
    Text,
    Video,
    /// Banner shown when a video pipeline cannot be built or fails.
    VideoFallback,
    Audio,
    Pdf,
}

/// Themed icon tokens used as deterministic fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    ImageMissing,
    ImageGeneric,
    TextGeneric,
    ApplicationPdf,
    VideoGeneric,
    AudioGeneric,
}

impl Icon {
    /// Freedesktop icon name.
    pub fn name(self) -> &'static str {
        match self {
            Icon::ImageMissing => "image-missing",
            Icon::ImageGeneric => "image-x-generic",
            Icon::TextGeneric => "text-x-generic",
            Icon::ApplicationPdf => "application-pdf",
            Icon::VideoGeneric => "video-x-generic",
            Icon::AudioGeneric => "audio-x-generic",
        }
    }
}

/// What an image slot displays.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageContent {
    #[default]
    Clear,
    Icon(Icon),
    Bitmap(RgbaImage),
}

impl ImageContent {
    pub fn is_clear(&self) -> bool {
        matches!(self, ImageContent::Clear)
    }

    pub fn icon(&self) -> Option<Icon> {
        match self {
            ImageContent::Icon(icon) => Some(*icon),
            _ => None,
        }
    }

    pub fn bitmap(&self) -> Option<&RgbaImage> {
        match self {
            ImageContent::Bitmap(bitmap) => Some(bitmap),
            _ => None,
        }
    }
}

/// Play button glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportGlyph {
    /// Shown while stopped or paused.
    #[default]
    Play,
    /// Shown while playing.
    Pause,
}

impl TransportGlyph {
    pub fn icon_name(self) -> &'static str {
        match self {
            TransportGlyph::Play => "media-playback-start-symbolic",
            TransportGlyph::Pause => "media-playback-pause-symbolic",
        }
    }
}

/// Opaque video output produced by a media backend and embedded by the UI.
///
/// The backend and the UI agree on the concrete type (a GTK widget for the
/// libmpv backend); the core only passes it along.
#[derive(Clone)]
pub struct VideoSink(Rc<dyn Any>);

impl VideoSink {
    pub fn new<T: Any>(inner: T) -> Self {
        Self(Rc::new(inner))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for VideoSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VideoSink(..)")
    }
}

/// The preview pane as seen by the selector.
pub trait PreviewSurfaces {
    /// Make `kind` the only visible surface.
    fn show(&self, kind: SurfaceKind);

    fn set_label(&self, text: &str);

    /// Content of the image surface (also used for the empty state).
    fn set_image(&self, content: ImageContent);

    fn set_text(&self, text: &str);

    /// Content of the PDF surface.
    fn set_document_image(&self, content: ImageContent);

    /// Width the pane is currently allocated, in pixels.
    fn allocated_width(&self) -> i32;
}

/// Play button and seek range of one pipeline.
pub trait TransportControls {
    fn set_glyph(&self, glyph: TransportGlyph);

    /// Move the seek range to `percent` (0–100) without emitting the
    /// value-changed notification that would trigger a seek.
    fn set_value_without_notify(&self, percent: f64);

    /// Whether the seek range widget exists yet.
    fn has_seek_range(&self) -> bool {
        true
    }
}

/// Container the video sink is embedded into.
pub trait VideoHost {
    /// Embed `sink`, replacing anything attached before.
    fn replace_sink(&self, sink: &VideoSink);

    fn clear_sink(&self);
}

/// Non-owning UI references handed to a pipeline controller at construction.
#[derive(Clone)]
pub struct SurfaceBinding {
    pub transport: Rc<dyn TransportControls>,
    /// Only the video controller gets one.
    pub video_host: Option<Rc<dyn VideoHost>>,
}

impl SurfaceBinding {
    pub fn audio(transport: Rc<dyn TransportControls>) -> Self {
        Self {
            transport,
            video_host: None,
        }
    }

    pub fn video(transport: Rc<dyn TransportControls>, host: Rc<dyn VideoHost>) -> Self {
        Self {
            transport,
            video_host: Some(host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_names() {
        assert_eq!(Icon::ApplicationPdf.name(), "application-pdf");
        assert_eq!(Icon::ImageMissing.name(), "image-missing");
        assert_eq!(Icon::TextGeneric.name(), "text-x-generic");
    }

    #[test]
    fn test_video_sink_downcast() {
        let sink = VideoSink::new(42u32);
        assert_eq!(sink.downcast_ref::<u32>(), Some(&42));
        assert!(sink.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_image_content_accessors() {
        assert!(ImageContent::default().is_clear());
        assert_eq!(
            ImageContent::Icon(Icon::ImageGeneric).icon(),
            Some(Icon::ImageGeneric)
        );
        let bitmap = RgbaImage::new(2, 2);
        assert_eq!(
            ImageContent::Bitmap(bitmap.clone()).bitmap(),
            Some(&bitmap)
        );
    }
}
