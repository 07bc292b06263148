//! Preview surfaces: selection dispatch plus the per-kind loaders.

pub mod animation;
pub mod document;
pub mod raster;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod selector;
pub mod text;

pub use animation::{AnimationController, AnimationCursor, LoopCount};
pub use document::{DocumentBackend, DocumentError, DocumentThumbnailer, PagedDocument};
pub use selector::{ActiveSurface, PreviewState, PreviewSurfaceSelector};
