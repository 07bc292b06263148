//! First-page thumbnails of paginated documents.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::config::PreviewConfig;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no document backend available")]
    Unavailable,

    #[error("could not open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("document has no pages")]
    NoPages,

    #[error("invalid page size {width}x{height}")]
    InvalidPageSize { width: f64, height: f64 },

    #[error("render failed: {0}")]
    Render(String),
}

/// Opens documents.
pub trait DocumentBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument + '_>, DocumentError>;
}

/// An opened document. Page sizes are in points.
pub trait PagedDocument {
    fn page_count(&self) -> usize;

    fn page_size(&self, index: usize) -> Result<(f64, f64), DocumentError>;

    /// Render page `index` at `scale` pixels per point.
    fn render_page(&self, index: usize, scale: f64) -> Result<RgbaImage, DocumentError>;
}

pub struct DocumentThumbnailer {
    backend: Rc<dyn DocumentBackend>,
}

impl DocumentThumbnailer {
    pub fn new(backend: Rc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Render page 0 of `path` to the pane width derived from
    /// `pane_width_hint`, composited onto white.
    pub fn render(
        &self,
        path: &Path,
        pane_width_hint: i32,
        config: &PreviewConfig,
    ) -> Result<RgbaImage, DocumentError> {
        let document = self.backend.open(path)?;
        if document.page_count() == 0 {
            return Err(DocumentError::NoPages);
        }

        let (width, height) = document.page_size(0)?;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(DocumentError::InvalidPageSize { width, height });
        }

        let target = f64::from(config.content_width(pane_width_hint));
        let scale = target / width;
        let page = document.render_page(0, scale)?;
        if page.width() == 0 || page.height() == 0 {
            return Err(DocumentError::Render("empty bitmap".to_string()));
        }

        debug!(
            ?path,
            scale,
            width = page.width(),
            height = page.height(),
            "Rendered document page"
        );
        Ok(flatten_on_white(page))
    }
}

/// Composite over an opaque white background.
pub fn flatten_on_white(mut page: RgbaImage) -> RgbaImage {
    for pixel in page.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        if a == 255 {
            continue;
        }
        let blend = |c: u8| -> u8 {
            let c = u32::from(c) * u32::from(a) + 255 * (255 - u32::from(a));
            (c / 255) as u8
        };
        *pixel = Rgba([blend(r), blend(g), blend(b), 255]);
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DocumentScript, FakeDocumentBackend};

    fn thumbnailer(script: DocumentScript) -> (Rc<FakeDocumentBackend>, DocumentThumbnailer) {
        let backend = Rc::new(FakeDocumentBackend::new(script));
        (backend.clone(), DocumentThumbnailer::new(backend))
    }

    #[test]
    fn test_scale_follows_pane_width() {
        let (backend, thumbs) = thumbnailer(DocumentScript::Pages {
            count: 3,
            width: 600.0,
            height: 800.0,
        });
        let config = PreviewConfig::default();

        let page = thumbs.render(Path::new("/tmp/a.pdf"), 320, &config).unwrap();
        assert_eq!(page.dimensions(), (300, 400));

        // Unallocated pane: 300 - 20.
        let page = thumbs.render(Path::new("/tmp/a.pdf"), 0, &config).unwrap();
        assert_eq!(page.width(), 280);

        assert_eq!(backend.scales(), vec![0.5, 280.0 / 600.0]);
    }

    #[test]
    fn test_open_failure() {
        let (_, thumbs) = thumbnailer(DocumentScript::OpenFails);
        let err = thumbs
            .render(Path::new("/tmp/x.pdf"), 300, &PreviewConfig::default())
            .unwrap_err();
        assert!(matches!(err, DocumentError::Open { .. }));
    }

    #[test]
    fn test_zero_pages() {
        let (backend, thumbs) = thumbnailer(DocumentScript::Pages {
            count: 0,
            width: 600.0,
            height: 800.0,
        });
        let err = thumbs
            .render(Path::new("/tmp/empty.pdf"), 300, &PreviewConfig::default())
            .unwrap_err();
        assert!(matches!(err, DocumentError::NoPages));
        assert!(backend.scales().is_empty());
    }

    #[test]
    fn test_degenerate_page_size() {
        let (_, thumbs) = thumbnailer(DocumentScript::Pages {
            count: 1,
            width: 0.0,
            height: 800.0,
        });
        let err = thumbs
            .render(Path::new("/tmp/zero.pdf"), 300, &PreviewConfig::default())
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPageSize { .. }));
    }

    #[test]
    fn test_render_failure() {
        let (_, thumbs) = thumbnailer(DocumentScript::RenderFails);
        assert!(thumbs
            .render(Path::new("/tmp/r.pdf"), 300, &PreviewConfig::default())
            .is_err());
    }

    #[test]
    fn test_flatten_on_white() {
        let mut page = RgbaImage::new(2, 1);
        page.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        page.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let page = flatten_on_white(page);
        assert_eq!(page.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(page.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
    }
}
