// Host window for the preview slot
// Directory listing on the left, preview pane on the right

use gdk4::Display;
use gtk4::prelude::*;
use gtk4::{
    Application, ApplicationWindow, Box as GtkBox, CssProvider, HeaderBar, Label, ListBox,
    Orientation, Paned, PolicyType, ScrolledWindow, SelectionMode, ToggleButton,
    STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::RefCell;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use walkdir::WalkDir;

use super::preview_pane::PreviewPane;
use super::scheduler::GlibScheduler;
use crate::config::PreviewConfig;
use crate::media::PipelineKind;
use crate::models::FileRef;
use crate::slot::{PreviewSlot, SlotBackends, SlotBindings, SlotEvent};
use crate::surfaces::SurfaceBinding;

const WINDOW_WIDTH: i32 = 1100;
const WINDOW_HEIGHT: i32 = 720;
const SNIFF_BYTES: u64 = 4096;

const PANE_CSS: &str = r#"
.preview-pane {
    border-left: 1px solid alpha(currentColor, 0.15);
    padding-top: 6px;
}

.entry-row {
    padding: 4px 8px;
}

.status-bar {
    padding: 2px 8px;
    font-size: smaller;
}
"#;

fn default_home_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(PANE_CSS);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

/// Up to `SNIFF_BYTES` of the file; whatever was read before an error.
fn read_head(path: &Path) -> Vec<u8> {
    let mut head = Vec::new();
    let read = std::fs::File::open(path)
        .and_then(|file| file.take(SNIFF_BYTES).read_to_end(&mut head));
    if let Err(e) = read {
        tracing::debug!("Sniffing {} failed: {}", path.display(), e);
    }
    head
}

/// MIME type from the file name and its first bytes.
fn guess_mime_type(path: &Path) -> Option<String> {
    let head = read_head(path);
    let (content_type, _uncertain) = gio::content_type_guess(Some(path), &head);
    gio::content_type_get_mime_type(&content_type).map(|mime| mime.to_string())
}

fn list_directory(dir: &Path) -> Vec<Rc<FileRef>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let path = entry.path();
            Rc::new(FileRef::local(path, guess_mime_type(path).as_deref()))
        })
        .collect()
}

#[allow(unused_mut)]
fn build_backends() -> SlotBackends {
    let mut backends = SlotBackends::default();

    #[cfg(feature = "mpv")]
    {
        backends.media = Some(Rc::new(crate::media::mpv::MpvBackend::new()));
    }

    #[cfg(feature = "pdfium")]
    match crate::preview::pdfium::PdfiumBackend::new() {
        Ok(backend) => backends.documents = Some(Rc::new(backend)),
        Err(e) => tracing::warn!("PDF previews disabled: {}", e),
    }

    backends
}

/// Forward an event unless the slot is gone or already handling one.
fn dispatch(slot: &Weak<RefCell<PreviewSlot>>, event: SlotEvent) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    match slot.try_borrow_mut() {
        Ok(mut slot) => slot.dispatch(event),
        Err(_) => tracing::debug!(?event, "Slot busy, dropping re-entrant event"),
    };
}

/// Main window hosting one preview slot
pub struct MainWindow {
    window: ApplicationWindow,
    list_box: ListBox,
    status: Label,
    pane: Rc<PreviewPane>,
    slot: Rc<RefCell<PreviewSlot>>,
    entries: RefCell<Vec<Rc<FileRef>>>,
}

impl MainWindow {
    pub fn new(app: &Application, initial_path: Option<&Path>) -> Rc<Self> {
        load_css();

        let config = PreviewConfig::from_env();
        let pane = PreviewPane::new(&config);
        let scheduler = GlibScheduler::new();

        let bindings = SlotBindings {
            surfaces: pane.clone(),
            video: SurfaceBinding::video(pane.video_transport(), pane.video_host()),
            audio: SurfaceBinding::audio(pane.audio_transport()),
        };
        let slot = Rc::new(RefCell::new(PreviewSlot::new(
            config.clone(),
            Rc::new(scheduler.clone()),
            bindings,
            build_backends(),
        )));

        let window = ApplicationWindow::builder()
            .application(app)
            .title("panepeek")
            .default_width(WINDOW_WIDTH)
            .default_height(WINDOW_HEIGHT)
            .build();

        let header = HeaderBar::new();
        let preview_toggle = ToggleButton::builder()
            .icon_name("view-dual-symbolic")
            .tooltip_text("Show preview pane")
            .build();
        header.pack_end(&preview_toggle);
        window.set_titlebar(Some(&header));

        let list_box = ListBox::new();
        list_box.set_selection_mode(SelectionMode::Multiple);
        let list_scroll = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .vexpand(true)
            .child(&list_box)
            .build();

        let status = Label::new(None);
        status.set_xalign(0.0);
        status.add_css_class("status-bar");

        let left = GtkBox::new(Orientation::Vertical, 0);
        left.append(&list_scroll);
        left.append(&status);

        let paned = Paned::new(Orientation::Horizontal);
        paned.set_start_child(Some(&left));
        paned.set_end_child(Some(pane.widget()));
        paned.set_resize_end_child(false);
        paned.set_shrink_end_child(false);
        paned.set_position(WINDOW_WIDTH - config.pane_default_width);
        window.set_child(Some(&paned));

        let main_window = Rc::new(Self {
            window,
            list_box,
            status,
            pane,
            slot,
            entries: RefCell::new(Vec::new()),
        });

        main_window.connect_signals(&scheduler, &preview_toggle);

        let dir = initial_path
            .map(Path::to_path_buf)
            .or_else(default_home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        main_window.load_directory(&dir);

        main_window
    }

    fn connect_signals(self: &Rc<Self>, scheduler: &GlibScheduler, preview_toggle: &ToggleButton) {
        let weak_slot = Rc::downgrade(&self.slot);
        scheduler.connect_fired(move |id| dispatch(&weak_slot, SlotEvent::TimerFired(id)));

        let weak_self = Rc::downgrade(self);
        self.list_box.connect_selected_rows_changed(move |list_box| {
            let Some(window) = weak_self.upgrade() else {
                return;
            };
            let selection: Vec<Rc<FileRef>> = {
                let entries = window.entries.borrow();
                list_box
                    .selected_rows()
                    .iter()
                    .filter_map(|row| usize::try_from(row.index()).ok())
                    .filter_map(|index| entries.get(index).cloned())
                    .collect()
            };
            dispatch(
                &Rc::downgrade(&window.slot),
                SlotEvent::SelectionChanged(selection),
            );
        });

        let weak_self = Rc::downgrade(self);
        preview_toggle.connect_toggled(move |toggle| {
            let Some(window) = weak_self.upgrade() else {
                return;
            };
            let visible = toggle.is_active();
            window.pane.widget().set_visible(visible);
            dispatch(
                &Rc::downgrade(&window.slot),
                SlotEvent::VisibilityToggled(visible),
            );
        });

        for (kind, transport) in [
            (PipelineKind::Video, self.pane.video_transport()),
            (PipelineKind::Audio, self.pane.audio_transport()),
        ] {
            let weak_slot = Rc::downgrade(&self.slot);
            transport.connect_play(move || dispatch(&weak_slot, SlotEvent::PlayToggled(kind)));
            let weak_slot = Rc::downgrade(&self.slot);
            transport.connect_seek(move |percent| {
                dispatch(&weak_slot, SlotEvent::SeekRequested(kind, percent))
            });
        }

        let slot = self.slot.clone();
        self.window.connect_close_request(move |_| {
            match slot.try_borrow_mut() {
                Ok(mut slot) => slot.dispose(),
                Err(_) => tracing::warn!("Slot busy at window close"),
            }
            glib::Propagation::Proceed
        });
    }

    pub fn load_directory(&self, dir: &Path) {
        let entries = list_directory(dir);
        tracing::info!("Listed {} files in {}", entries.len(), dir.display());

        // Clear the selection first so the slot drops its view of old rows.
        self.list_box.unselect_all();
        self.list_box.remove_all();
        for entry in &entries {
            let label = Label::new(Some(entry.display_name()));
            label.set_xalign(0.0);
            label.add_css_class("entry-row");
            self.list_box.append(&label);
        }
        self.status
            .set_text(&format!("{} files in {}", entries.len(), dir.display()));
        *self.entries.borrow_mut() = entries;

        let location = Rc::new(FileRef::local(dir, Some("inode/directory")));
        match self.slot.try_borrow_mut() {
            Ok(mut slot) => slot.set_location(location),
            Err(_) => tracing::warn!("Slot busy, location not updated"),
        }
    }

    pub fn present(&self) {
        self.window.present();
    }
}
