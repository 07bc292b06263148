//! MIME type → preview class.

/// Which preview surface family a MIME type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeClass {
    Image,
    Text,
    Video,
    Audio,
    Pdf,
    Other,
}

/// Which optional backends are available to the slot.
///
/// Video/audio only classify as such when a media backend exists, PDF only
/// when a document backend exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub media: bool,
    pub document: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        media: true,
        document: true,
    };
}

/// `application/*` types whose content is human-readable text.
pub const STRUCTURED_TEXT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-shellscript",
    "application/x-perl",
    "application/x-python",
    "application/x-ruby",
    "application/x-php",
    "application/x-yaml",
    "application/toml",
    "application/sql",
];

pub const GIF_MIME_TYPE: &str = "image/gif";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Classify a MIME type. Total and side-effect free; first match wins in the
/// order image, text, video, audio, pdf.
pub fn classify(mime_type: Option<&str>, caps: Capabilities) -> MimeClass {
    let Some(mime) = mime_type else {
        return MimeClass::Other;
    };

    if mime.starts_with("image/") {
        MimeClass::Image
    } else if is_text_mime_type(mime) {
        MimeClass::Text
    } else if caps.media && mime.starts_with("video/") {
        MimeClass::Video
    } else if caps.media && mime.starts_with("audio/") {
        MimeClass::Audio
    } else if caps.document && mime == PDF_MIME_TYPE {
        MimeClass::Pdf
    } else {
        MimeClass::Other
    }
}

pub fn is_text_mime_type(mime: &str) -> bool {
    mime.starts_with("text/") || STRUCTURED_TEXT_TYPES.contains(&mime)
}

/// GIFs go through the animation path instead of the static decoder.
pub fn is_gif(mime_type: Option<&str>) -> bool {
    mime_type == Some(GIF_MIME_TYPE)
}
