//! Preview tuning knobs.
//!
//! Every value has a compiled-in default; a handful can be overridden through
//! `PANEPEEK_*` environment variables for constrained setups.

use std::ffi::CStr;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::debug;

/// Largest text file prefix shown in the text surface (1 MiB).
pub const DEFAULT_TEXT_MAX_BYTES: usize = 1024 * 1024;
/// Below this allocated width the pane is considered not laid out yet.
pub const PANE_MIN_WIDTH: i32 = 200;
/// Width assumed when the pane is narrower than [`PANE_MIN_WIDTH`].
pub const PANE_DEFAULT_WIDTH: i32 = 300;
/// Horizontal padding subtracted from the pane width for content.
pub const PANE_PADDING: i32 = 20;
/// Period of the playback position poll.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
/// Shortest delay honoured between two animation frames.
pub const MIN_FRAME_DELAY_MS: i32 = 20;
/// File name of the local video setup guide linked from the fallback banner.
pub const VIDEO_HELP_DOC: &str = "video-preview-setup.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub text_max_bytes: usize,
    pub pane_min_width: i32,
    pub pane_default_width: i32,
    pub pane_padding: i32,
    pub poll_interval: Duration,
    pub min_frame_delay_ms: i32,
    /// Charset used to repair text that is not valid UTF-8.
    pub locale_codeset: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            text_max_bytes: DEFAULT_TEXT_MAX_BYTES,
            pane_min_width: PANE_MIN_WIDTH,
            pane_default_width: PANE_DEFAULT_WIDTH,
            pane_padding: PANE_PADDING,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            min_frame_delay_ms: MIN_FRAME_DELAY_MS,
            locale_codeset: "UTF-8".to_string(),
        }
    }
}

impl PreviewConfig {
    /// Defaults plus any `PANEPEEK_*` overrides found in the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(bytes) = env_positive("PANEPEEK_TEXT_MAX_BYTES") {
            config.text_max_bytes = bytes as usize;
        }
        if let Some(width) = env_positive("PANEPEEK_PANE_DEFAULT_WIDTH") {
            config.pane_default_width = i32::try_from(width).unwrap_or(PANE_DEFAULT_WIDTH);
        }
        if let Some(ms) = env_positive("PANEPEEK_POLL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        config.locale_codeset = detect_codeset();
        debug!(?config, "Preview configuration loaded");
        config
    }

    /// Width available to preview content for a pane allocated `allocated`
    /// pixels wide.
    ///
    /// A pane that has not been laid out yet reports a tiny width, so anything
    /// under `pane_min_width` falls back to `pane_default_width`.
    pub fn content_width(&self, allocated: i32) -> i32 {
        let width = if allocated < self.pane_min_width {
            allocated.max(self.pane_default_width)
        } else {
            allocated
        };
        (width - self.pane_padding).max(1)
    }
}

fn env_positive(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Charset of the current locale.
///
/// `PANEPEEK_CODESET` wins, then the codeset suffix of `LC_ALL`, `LC_CTYPE`
/// or `LANG`, then whatever `nl_langinfo(CODESET)` reports.
pub fn detect_codeset() -> String {
    if let Ok(codeset) = std::env::var("PANEPEEK_CODESET") {
        if !codeset.trim().is_empty() {
            return codeset.trim().to_string();
        }
    }

    for var in ["LC_ALL", "LC_CTYPE", "LANG"] {
        let Ok(value) = std::env::var(var) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        // First non-empty variable decides, like setlocale does.
        return codeset_from_locale_name(&value).unwrap_or_else(langinfo_codeset);
    }

    langinfo_codeset()
}

/// Extract `UTF-8` out of `en_US.UTF-8@euro`.
fn codeset_from_locale_name(name: &str) -> Option<String> {
    let (_, rest) = name.split_once('.')?;
    let codeset = rest.split('@').next().unwrap_or(rest);
    if codeset.is_empty() {
        None
    } else {
        Some(codeset.to_string())
    }
}

fn langinfo_codeset() -> String {
    // SAFETY: nl_langinfo returns a pointer to a static, NUL-terminated string
    // owned by libc; it is copied out immediately.
    let raw = unsafe { libc::nl_langinfo(libc::CODESET) };
    if raw.is_null() {
        return "ANSI_X3.4-1968".to_string();
    }
    unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
}

/// `file://` URI of the local video setup guide, if it can be located.
///
/// `PANEPEEK_DOC_DIR` overrides the XDG data directory.
pub fn video_help_uri() -> Option<String> {
    let dir = match std::env::var("PANEPEEK_DOC_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => ProjectDirs::from("", "", "panepeek")?.data_dir().to_path_buf(),
    };
    let path = dir.join(VIDEO_HELP_DOC);
    Some(crate::models::file_uri(&path)).filter(|uri| !uri.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pane_constants() {
        let config = PreviewConfig::default();
        assert_eq!(config.text_max_bytes, 1_048_576);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.pane_min_width, 200);
        assert_eq!(config.pane_default_width, 300);
    }

    #[test]
    fn test_content_width_falls_back_for_unallocated_pane() {
        let config = PreviewConfig::default();
        assert_eq!(config.content_width(0), 280);
        assert_eq!(config.content_width(150), 280);
        assert_eq!(config.content_width(199), 280);
    }

    #[test]
    fn test_content_width_uses_allocation() {
        let config = PreviewConfig::default();
        assert_eq!(config.content_width(200), 180);
        assert_eq!(config.content_width(500), 480);
    }

    #[test]
    fn test_codeset_from_locale_name() {
        assert_eq!(
            codeset_from_locale_name("en_US.UTF-8").as_deref(),
            Some("UTF-8")
        );
        assert_eq!(
            codeset_from_locale_name("de_DE.ISO-8859-1@euro").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(codeset_from_locale_name("C"), None);
        assert_eq!(codeset_from_locale_name("fr_FR."), None);
    }

    #[test]
    fn test_video_help_uri_points_at_setup_doc() {
        if let Some(uri) = video_help_uri() {
            assert!(uri.starts_with("file://"));
            assert!(uri.ends_with(VIDEO_HELP_DOC));
        }
    }

    #[test]
    fn test_video_help_uri_escapes_doc_dir() {
        std::env::set_var("PANEPEEK_DOC_DIR", "/opt/pane peek#docs");
        let uri = video_help_uri();
        std::env::remove_var("PANEPEEK_DOC_DIR");
        assert_eq!(
            uri.as_deref(),
            Some("file:///opt/pane%20peek%23docs/video-preview-setup.md")
        );
    }
}
