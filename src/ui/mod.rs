pub mod preview_pane;
pub mod scheduler;
pub mod window;

pub use preview_pane::{GtkTransport, GtkVideoHost, PreviewPane};
pub use scheduler::GlibScheduler;
pub use window::MainWindow;
