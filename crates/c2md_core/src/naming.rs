use std::path::{Path, PathBuf};

/// Image directory used when the Markdown is not written next to a file.
pub const DEFAULT_IMAGE_DIR: &str = "assets";

/// Attachment extensions that are downloaded as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp"];

const FALLBACK_NAME: &str = "page";

/// Turn a page title into a filename stem that is safe on every platform.
///
/// Forbidden characters become `_`, runs of `_` and whitespace collapse to a
/// single `_`, and leading/trailing separators are dropped. Trailing dots are
/// dropped too.
pub fn sanitize_filename(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    let mut pending_separator = false;
    for c in title.chars() {
        if is_forbidden(c) || c == '_' || c.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if pending_separator && !cleaned.is_empty() {
            cleaned.push('_');
        }
        pending_separator = false;
        cleaned.push(c);
    }

    // Windows refuses names ending in a dot.
    let mut cleaned = cleaned.trim_end_matches(&['.', '_'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = FALLBACK_NAME.to_string();
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

/// Resolve where the Markdown file goes.
///
/// An existing directory, or a path without an extension, is treated as a
/// directory and the filename is derived from the page title.
pub fn resolve_output_path(output: &Path, title: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.md", sanitize_filename(title)))
    } else {
        output.to_path_buf()
    }
}

pub fn is_image_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Reduce an attachment title to a bare filename so it cannot escape the
/// target directory.
pub fn safe_attachment_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
