//! libmpv playback backend.
//!
//! Each pipeline owns its own mpv instance, created paused with
//! `keep-open=yes` so the last frame stays up at end of file. Video renders
//! through the libmpv OpenGL render API into a GTK4 `GLArea`; the render
//! context can only be created once the area is realized, so the file load
//! is deferred until then. Audio runs with `vo=null` and no video track.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::c_void;
use std::rc::Rc;
use std::time::Duration;

use gtk4::prelude::*;
use gtk4::{gdk, glib, GLArea};
use libmpv2::render::{OpenGLInitParams, RenderContext, RenderParam, RenderParamApiType};
use libmpv2::Mpv;
use once_cell::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::{BackendState, MediaBackend, Pipeline, PipelineError, PipelineEvent, PipelineKind};
use crate::surfaces::VideoSink;

static EPOXY_INITIALIZED: OnceCell<()> = OnceCell::new();

fn ensure_epoxy_initialized() {
    EPOXY_INITIALIZED.get_or_init(|| {
        // GTK4 links epoxy, so the symbols are already in the process.
        epoxy::load_with(|s| unsafe {
            let handle = libc::dlopen(std::ptr::null(), libc::RTLD_NOW | libc::RTLD_GLOBAL);
            if handle.is_null() {
                return std::ptr::null();
            }
            let Ok(c_str) = std::ffi::CString::new(s) else {
                libc::dlclose(handle);
                return std::ptr::null();
            };
            let sym = libc::dlsym(handle, c_str.as_ptr());
            libc::dlclose(handle);
            sym
        });
    });
}

/// libmpv parses option values with the C numeric locale.
fn force_c_numeric_locale() {
    let locale_set = unsafe { libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast()) };
    if locale_set.is_null() {
        warn!("Failed to set LC_NUMERIC=C before mpv init");
    }
}

struct GlContext;

fn get_proc_address(_ctx: &GlContext, name: &str) -> *mut c_void {
    epoxy::get_proc_addr(name) as *mut c_void
}

#[derive(Default)]
struct MpvState {
    mpv: Option<Mpv>,
    render_ctx: Option<RenderContext>,
    /// Video waits for the GL context before loading.
    pending_uri: Option<String>,
    /// Failures raised outside a pipeline call, reported on the next drain.
    errors: VecDeque<String>,
}

impl MpvState {
    /// Render context first, then the handle it was created from.
    fn release(&mut self) {
        self.render_ctx = None;
        if let Some(mpv) = self.mpv.take() {
            if let Err(e) = mpv.command("stop", &[]) {
                debug!("mpv stop on release failed: {}", e);
            }
        }
    }
}

/// Builds one libmpv instance per pipeline.
#[derive(Debug, Default)]
pub struct MpvBackend;

impl MpvBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for MpvBackend {
    fn create_pipeline(
        &self,
        kind: PipelineKind,
        uri: &str,
    ) -> Result<Box<dyn Pipeline>, PipelineError> {
        let mpv = init_mpv(kind).map_err(|e| PipelineError::ElementCreation(e.to_string()))?;
        let state = Rc::new(RefCell::new(MpvState {
            mpv: Some(mpv),
            ..MpvState::default()
        }));

        let gl_area = match kind {
            PipelineKind::Video => {
                state.borrow_mut().pending_uri = Some(uri.to_string());
                Some(build_gl_area(&state))
            }
            PipelineKind::Audio => {
                load_file(&state.borrow(), uri)?;
                None
            }
        };

        let tick = gl_area.as_ref().map(|area| {
            area.add_tick_callback(|area, _clock| {
                area.queue_render();
                glib::ControlFlow::Continue
            })
        });

        info!(%kind, uri, "mpv pipeline created");
        Ok(Box::new(MpvPipeline {
            kind,
            state,
            gl_area,
            tick,
            eof_reported: false,
        }))
    }
}

fn init_mpv(kind: PipelineKind) -> Result<Mpv, libmpv2::Error> {
    force_c_numeric_locale();

    Mpv::with_initializer(|init| {
        match kind {
            PipelineKind::Video => {
                init.set_option("hwdec", "auto-safe")?;
                init.set_option("vo", "libmpv")?;
            }
            PipelineKind::Audio => {
                init.set_option("vo", "null")?;
                init.set_option("vid", "no")?;
            }
        }
        init.set_option("ao", "pipewire,pulse,alsa")?;
        init.set_option("keep-open", "yes")?;
        init.set_option("pause", "yes")?;
        init.set_option("osd-level", 0i64)?;
        init.set_option("terminal", false)?;
        init.set_option("input-default-bindings", false)?;
        init.set_option("msg-level", "all=warn")?;
        Ok(())
    })
}

fn load_file(state: &MpvState, uri: &str) -> Result<(), PipelineError> {
    let Some(mpv) = state.mpv.as_ref() else {
        return Err(PipelineError::UriAssignment {
            uri: uri.to_string(),
            reason: "mpv released".to_string(),
        });
    };
    mpv.command("loadfile", &[uri, "replace"])
        .map_err(|e| PipelineError::UriAssignment {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
}

fn build_gl_area(state: &Rc<RefCell<MpvState>>) -> GLArea {
    let gl_area = GLArea::new();
    gl_area.set_auto_render(false);
    gl_area.set_has_depth_buffer(false);
    gl_area.set_has_stencil_buffer(false);
    gl_area.set_hexpand(true);
    gl_area.set_vexpand(true);
    gl_area.set_allowed_apis(gdk::GLAPI::GL | gdk::GLAPI::GLES);

    let realize_state = state.clone();
    gl_area.connect_realize(move |gl_area| {
        gl_area.make_current();
        let mut state = realize_state.borrow_mut();
        if let Some(err) = gl_area.error() {
            error!("GLArea error on realize: {}", err);
            state.errors.push_back(format!("OpenGL unavailable: {}", err));
            return;
        }
        if state.render_ctx.is_some() {
            return;
        }

        ensure_epoxy_initialized();
        let Some(mpv) = state.mpv.as_mut() else {
            return;
        };
        let params = vec![
            RenderParam::ApiType(RenderParamApiType::OpenGl),
            RenderParam::InitParams(OpenGLInitParams {
                get_proc_address,
                ctx: GlContext,
            }),
        ];
        // SAFETY: the handle is exclusively borrowed and outlives the
        // context; MpvState::release drops the context first.
        match unsafe { RenderContext::new(mpv.ctx.as_mut(), params.into_iter()) } {
            Ok(render_ctx) => {
                state.render_ctx = Some(render_ctx);
                debug!("mpv render context created");
            }
            Err(e) => {
                state
                    .errors
                    .push_back(format!("mpv render context failed: {}", e));
                return;
            }
        }

        if let Some(uri) = state.pending_uri.take() {
            if let Err(e) = load_file(&state, &uri) {
                state.errors.push_back(e.to_string());
            }
        }
    });

    let unrealize_state = state.clone();
    gl_area.connect_unrealize(move |gl_area| {
        gl_area.make_current();
        unrealize_state.borrow_mut().render_ctx = None;
    });

    let render_state = state.clone();
    gl_area.connect_render(move |gl_area, _gl_context| {
        let state = render_state.borrow();
        if let Some(render_ctx) = state.render_ctx.as_ref() {
            let scale = gl_area.scale_factor();
            let width = gl_area.width() * scale;
            let height = gl_area.height() * scale;
            if let Err(e) = render_ctx.render::<GlContext>(0, width, height, true) {
                error!("mpv render error: {}", e);
            }
        }
        glib::Propagation::Stop
    });

    gl_area
}

pub struct MpvPipeline {
    kind: PipelineKind,
    state: Rc<RefCell<MpvState>>,
    gl_area: Option<GLArea>,
    tick: Option<gtk4::TickCallbackId>,
    eof_reported: bool,
}

impl MpvPipeline {
    fn property_seconds(&self, name: &str) -> Option<Duration> {
        let state = self.state.borrow();
        let seconds: f64 = state.mpv.as_ref()?.get_property(name).ok()?;
        (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
    }
}

impl Pipeline for MpvPipeline {
    fn set_state(&mut self, target: BackendState) -> Result<(), PipelineError> {
        let state = self.state.borrow();
        let Some(mpv) = state.mpv.as_ref() else {
            return match target {
                BackendState::Null => Ok(()),
                _ => Err(PipelineError::StateChange {
                    state: target,
                    reason: "mpv released".to_string(),
                }),
            };
        };

        let result = match target {
            BackendState::Null => mpv.command("stop", &[]),
            BackendState::Paused => mpv.set_property("pause", true),
            BackendState::Playing => mpv.set_property("pause", false),
        };
        result.map_err(|e| PipelineError::StateChange {
            state: target,
            reason: e.to_string(),
        })
    }

    fn position(&self) -> Option<Duration> {
        self.property_seconds("time-pos")
    }

    fn duration(&self) -> Option<Duration> {
        self.property_seconds("duration")
    }

    fn seek(&mut self, position: Duration) -> Result<(), PipelineError> {
        let state = self.state.borrow();
        let mpv = state
            .mpv
            .as_ref()
            .ok_or_else(|| PipelineError::Seek("mpv released".to_string()))?;
        let target = format!("{:.3}", position.as_secs_f64());
        mpv.command("seek", &[&target, "absolute+keyframes"])
            .map_err(|e| PipelineError::Seek(e.to_string()))?;
        self.eof_reported = false;
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<PipelineEvent> {
        let mut state = self.state.borrow_mut();
        let mut events: Vec<PipelineEvent> = state.errors.drain(..).map(PipelineEvent::Error).collect();

        let Some(mpv) = state.mpv.as_mut() else {
            return events;
        };
        let event_ctx = mpv.event_context_mut();
        while let Some(event) = event_ctx.wait_event(0.0) {
            match event {
                Ok(libmpv2::events::Event::FileLoaded) => debug!(kind = %self.kind, "File loaded"),
                Ok(libmpv2::events::Event::EndFile(reason)) => {
                    debug!(kind = %self.kind, ?reason, "End file event")
                }
                Ok(_) => {}
                Err(e) => events.push(PipelineEvent::Error(e.to_string())),
            }
        }

        let eof: bool = mpv.get_property("eof-reached").unwrap_or(false);
        if eof && !self.eof_reported {
            events.push(PipelineEvent::EndOfStream);
        }
        self.eof_reported = eof;

        if let Some(area) = self.gl_area.as_ref() {
            area.queue_render();
        }
        events
    }

    fn video_sink(&self) -> Option<VideoSink> {
        self.gl_area
            .as_ref()
            .map(|area| VideoSink::new(area.clone().upcast::<gtk4::Widget>()))
    }
}

impl Drop for MpvPipeline {
    fn drop(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.remove();
        }
        if let Some(area) = self.gl_area.as_ref() {
            if area.is_realized() {
                area.make_current();
            }
        }
        self.state.borrow_mut().release();
        info!(kind = %self.kind, "mpv pipeline released");
    }
}
