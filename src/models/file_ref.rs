use std::path::{Path, PathBuf};

use url::Url;

/// Percent-encoded `file://` URI for a local path. Relative paths are
/// resolved against the working directory; an empty string means the path
/// has no URI form.
pub fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match Url::from_file_path(&absolute) {
        Ok(url) => url.into(),
        Err(()) => {
            tracing::warn!(path = %path.display(), "Path has no file URI");
            String::new()
        }
    }
}

/// Where a file lives: a local path when the file is on a local filesystem,
/// and always a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub local_path: Option<PathBuf>,
    pub uri: String,
}

/// A file as seen by the preview pane.
///
/// The content view owns these; the slot only keeps weak references to the
/// current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    display_name: String,
    mime_type: Option<String>,
    location: FileLocation,
}

impl FileRef {
    pub fn new(
        display_name: impl Into<String>,
        mime_type: Option<String>,
        location: FileLocation,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type,
            location,
        }
    }

    /// A file on a local filesystem.
    pub fn local(path: &Path, mime_type: Option<&str>) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            display_name,
            mime_type: mime_type.map(str::to_string),
            location: FileLocation {
                local_path: Some(path.to_path_buf()),
                uri: file_uri(path),
            },
        }
    }

    /// A file only reachable through a URI (network mounts, archives, ...).
    pub fn remote(
        uri: impl Into<String>,
        display_name: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: mime_type.map(str::to_string),
            location: FileLocation {
                local_path: None,
                uri: uri.into(),
            },
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn location(&self) -> &FileLocation {
        &self.location
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.location.local_path.as_deref()
    }

    pub fn uri(&self) -> &str {
        &self.location.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_ref() {
        let file = FileRef::local(Path::new("/tmp/photos/cat.png"), Some("image/png"));
        assert_eq!(file.display_name(), "cat.png");
        assert_eq!(file.mime_type(), Some("image/png"));
        assert_eq!(file.local_path(), Some(Path::new("/tmp/photos/cat.png")));
        assert_eq!(file.uri(), "file:///tmp/photos/cat.png");
    }

    #[test]
    fn test_local_uri_is_percent_encoded() {
        let file = FileRef::local(Path::new("/tmp/My Clip #2 100%20.mp4"), Some("video/mp4"));
        assert_eq!(file.uri(), "file:///tmp/My%20Clip%20%232%20100%2520.mp4");
        assert_eq!(file.display_name(), "My Clip #2 100%20.mp4");
    }

    #[test]
    fn test_non_utf8_path_bytes_survive_in_uri() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/caf\xe9.ogg"));
        assert_eq!(file_uri(path), "file:///tmp/caf%E9.ogg");
    }

    #[test]
    fn test_relative_path_gets_absolute_uri() {
        let uri = file_uri(Path::new("clip.webm"));
        assert!(uri.starts_with("file:///"), "{uri}");
        assert!(uri.ends_with("/clip.webm"), "{uri}");
    }

    #[test]
    fn test_remote_file_ref_has_no_local_path() {
        let file = FileRef::remote("sftp://host/notes.txt", "notes.txt", Some("text/plain"));
        assert!(file.local_path().is_none());
        assert_eq!(file.uri(), "sftp://host/notes.txt");
    }
}
