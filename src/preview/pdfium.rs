//! PDF backend on top of pdfium.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use super::document::{DocumentBackend, DocumentError, PagedDocument};

pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind to the system pdfium, falling back to `PANEPEEK_PDFIUM_DIR`.
    pub fn new() -> Result<Self, DocumentError> {
        let bindings = Pdfium::bind_to_system_library()
            .or_else(|system_err| {
                let Some(dir) = std::env::var_os("PANEPEEK_PDFIUM_DIR").map(PathBuf::from) else {
                    return Err(system_err);
                };
                debug!(?dir, "System pdfium missing, trying override directory");
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            })
            .map_err(|e| {
                debug!("pdfium unavailable: {}", e);
                DocumentError::Unavailable
            })?;

        info!("pdfium document backend ready");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl DocumentBackend for PdfiumBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument + '_>, DocumentError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| DocumentError::Open {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, DocumentError> {
        if index >= self.page_count() {
            return Err(DocumentError::NoPages);
        }
        self.document
            .pages()
            .get(index as _)
            .map_err(|e| DocumentError::Render(e.to_string()))
    }
}

impl PagedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<(f64, f64), DocumentError> {
        let page = self.page(index)?;
        Ok((
            f64::from(page.width().value),
            f64::from(page.height().value),
        ))
    }

    fn render_page(&self, index: usize, scale: f64) -> Result<RgbaImage, DocumentError> {
        let page = self.page(index)?;
        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .scale_page_by_factor(scale as f32)
                    .set_clear_color(PdfColor::WHITE),
            )
            .map_err(|e| DocumentError::Render(e.to_string()))?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| DocumentError::Render(format!("bad bitmap {}x{}", width, height)))
    }
}
