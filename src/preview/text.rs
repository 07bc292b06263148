//! Text surface content: bounded read, UTF-8 validation, locale repair.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

pub const TRUNCATION_NOTICE: &str = "\n\n... [truncated - file too large] ...";
pub const BINARY_PLACEHOLDER: &str = "[Binary or non-UTF8 content]";
pub const REMOTE_PLACEHOLDER: &str = "[Remote file - preview not available]";

/// Read at most `max_bytes` of `path`. The flag reports whether the file was
/// longer than that.
pub fn read_prefix(path: &Path, max_bytes: usize) -> Result<(Vec<u8>, bool)> {
    let file = File::open(path).with_context(|| format!("Error opening file {}", path.display()))?;
    let mut bytes = Vec::new();
    file.take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Error reading file {}", path.display()))?;

    let truncated = bytes.len() > max_bytes;
    bytes.truncate(max_bytes);
    Ok((bytes, truncated))
}

/// Turn raw bytes into displayable text, or `None` when they are not text in
/// UTF-8 or the locale charset. Embedded NULs never count as text.
pub fn decode_text(bytes: &[u8], truncated: bool, codeset: &str) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_owned()),
        // Only an incomplete trailing sequence, cut by truncation.
        Err(e) if truncated && e.error_len().is_none() => {
            let valid = &bytes[..e.valid_up_to()];
            let mut text = String::from_utf8_lossy(valid).into_owned();
            text.push(char::REPLACEMENT_CHARACTER);
            Some(text)
        }
        Err(_) => locale_to_utf8(bytes, codeset),
    }
}

/// ASCII codesets as `nl_langinfo` reports them. Their labels resolve to
/// windows-1252, which would accept any byte.
const ASCII_CODESETS: &[&str] = &["ANSIX341968", "ASCII", "USASCII", "646"];

/// Convert from the locale charset. In a UTF-8 or ASCII locale invalid UTF-8
/// stays invalid; unknown charsets convert nothing.
pub fn locale_to_utf8(bytes: &[u8], codeset: &str) -> Option<String> {
    let normalized: String = codeset
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if ASCII_CODESETS.contains(&normalized.as_str()) {
        return None;
    }

    let Some(encoding) = Encoding::for_label(codeset.trim().as_bytes()) else {
        debug!(codeset, "No conversion from locale charset");
        return None;
    };
    if encoding == UTF_8 {
        return None;
    }
    let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    Some(text.into_owned())
}

/// Full text-surface content for a file.
pub fn load_text_preview(path: Option<&Path>, max_bytes: usize, codeset: &str) -> String {
    let Some(path) = path else {
        return REMOTE_PLACEHOLDER.to_string();
    };

    let (bytes, truncated) = match read_prefix(path, max_bytes) {
        Ok(read) => read,
        Err(e) => {
            warn!("{:#}", e);
            return format!("Could not load file: {:#}", e);
        }
    };

    let Some(mut text) = decode_text(&bytes, truncated, codeset) else {
        debug!(?path, "Content is not text");
        return BINARY_PLACEHOLDER.to_string();
    };
    if truncated {
        debug!(?path, max_bytes, "Text preview truncated");
        text.push_str(TRUNCATION_NOTICE);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1_048_576;

    #[test]
    fn test_small_file_shown_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello\nworld\n").unwrap();
        assert_eq!(load_text_preview(Some(&path), MAX, "UTF-8"), "hello\nworld\n");
    }

    #[test]
    fn test_exact_limit_is_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.txt");
        std::fs::write(&path, vec![b'a'; MAX]).unwrap();
        let text = load_text_preview(Some(&path), MAX, "UTF-8");
        assert_eq!(text.len(), MAX);
        assert!(!text.ends_with(TRUNCATION_NOTICE));
    }

    #[test]
    fn test_truncation_law() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.log");
        std::fs::write(&path, vec![b'x'; MAX + 4096]).unwrap();

        let text = load_text_preview(Some(&path), MAX, "UTF-8");
        assert_eq!(text.len(), MAX + TRUNCATION_NOTICE.len());
        assert!(text.ends_with(TRUNCATION_NOTICE));
    }

    #[test]
    fn test_cut_multibyte_tail_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accents.txt");
        // "aé" is 3 bytes; cut inside the é.
        std::fs::write(&path, "aéb").unwrap();
        let text = load_text_preview(Some(&path), 2, "UTF-8");
        assert_eq!(text, format!("a\u{FFFD}{}", TRUNCATION_NOTICE));
    }

    #[test]
    fn test_invalid_utf8_in_utf8_locale_is_binary() {
        assert_eq!(decode_text(&[0x66, 0xff, 0xfe, 0x00], false, "UTF-8"), None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0xffu8, 0xd8, 0xff, 0xe0]).unwrap();
        assert_eq!(load_text_preview(Some(&path), MAX, "UTF-8"), BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_latin1_locale_repairs_text() {
        assert_eq!(
            decode_text(b"caf\xe9", false, "ISO-8859-1").as_deref(),
            Some("café")
        );
        assert_eq!(locale_to_utf8(b"\xe9", "ANSI_X3.4-1968"), None);
    }

    #[test]
    fn test_embedded_nul_is_binary() {
        assert_eq!(decode_text(b"h\0i\0\n\0", false, "UTF-8"), None);
        assert_eq!(decode_text(b"caf\xe9\0", false, "ISO-8859-1"), None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utf16.txt");
        std::fs::write(&path, b"h\0i\0\n\0").unwrap();
        assert_eq!(load_text_preview(Some(&path), MAX, "UTF-8"), BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_locale_charsets_convert() {
        assert_eq!(locale_to_utf8(b"\xa4", "ISO-8859-15").as_deref(), Some("\u{20ac}"));
        assert_eq!(
            locale_to_utf8(b"\xcf\xf0\xe8\xe2\xe5\xf2", "CP1251").as_deref(),
            Some("Привет")
        );
        assert_eq!(locale_to_utf8(b"\xf0\xd2\xc9", "KOI8-R").as_deref(), Some("При"));
        assert_eq!(locale_to_utf8(b"\xe9", "UTF-8"), None);
        assert_eq!(locale_to_utf8(b"\xe9", "US-ASCII"), None);
        assert_eq!(locale_to_utf8(b"\xe9", "NOT-A-CHARSET"), None);
    }

    #[test]
    fn test_remote_placeholder() {
        assert_eq!(load_text_preview(None, MAX, "UTF-8"), REMOTE_PLACEHOLDER);
    }

    #[test]
    fn test_read_error_is_inline_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        let text = load_text_preview(Some(&path), MAX, "UTF-8");
        assert!(text.starts_with("Could not load file: "), "{text}");
        assert!(text.contains("gone.txt"));
    }
}
