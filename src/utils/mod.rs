use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

/// Current local time formatted with second precision, e.g. `20240131235959`
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect()
}

/// Host of the URL as it appears in the authority, keeping an explicit port.
fn authority_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Create `{host}_{timestamp}` under `base` and return its path.
///
/// Creation is idempotent; the timestamp makes a collision between runs
/// practically impossible.
pub fn create_output_directory(base: &Path, url: &Url) -> io::Result<PathBuf> {
    let folder_name = sanitize_filename(&format!("{}_{}", authority_of(url), get_timestamp()));
    let path = base.join(folder_name);
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Decoded and sanitized last path segment of `url`, or `fallback` if there is none.
///
/// Decoding happens before sanitizing so an encoded `/` cannot name a subfolder.
pub fn filename_from_url(url: &Url, fallback: &str) -> String {
    let basename = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default();

    if basename.is_empty() {
        return fallback.to_string();
    }

    let decoded = percent_decode_str(basename).decode_utf8_lossy();
    let sanitized = sanitize_filename(&decoded);
    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized
    }
}
