use std::path::{Path, PathBuf};

use gtk4::prelude::*;
use gtk4::{gio, Application};

use crate::ui::MainWindow;

const APP_ID: &str = "io.github.panepeek.Panepeek";
const WINDOW_DATA_KEY: &str = "panepeek-window";

/// Directory to list for a command-line argument: a file opens its parent.
fn listing_dir(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        Some(path.to_path_buf())
    } else {
        path.parent().map(Path::to_path_buf)
    }
}

pub struct PanepeekApp {
    app: Application,
}

impl PanepeekApp {
    pub fn new() -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        app.connect_activate(|app| Self::present_window(app, None));
        app.connect_open(|app, files, _hint| {
            let dir = files
                .first()
                .and_then(|f| f.path())
                .and_then(|path| listing_dir(&path));
            Self::present_window(app, dir.as_deref());
        });

        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn present_window(app: &Application, dir: Option<&Path>) {
        tracing::info!(dir = ?dir, "Opening window");
        let window = MainWindow::new(app, dir);
        window.present();
        // The application holds the only strong reference to the window.
        unsafe {
            app.set_data(WINDOW_DATA_KEY, window);
        }
    }
}

impl Default for PanepeekApp {
    fn default() -> Self {
        Self::new()
    }
}
