pub mod file_ref;
pub mod mime;

pub use file_ref::*;
pub use mime::*;
