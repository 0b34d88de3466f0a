//! Utility functions for cache keys, response filenames and path handling

use crate::error::{Error, Result};
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use std::path::{Path, PathBuf};
use url::Url;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Canonical cache key for a request URL
///
/// The fragment never reaches the server, so it is not part of the key.
/// Scheme and host are already lowercased by URL parsing.
///
/// # Examples
///
/// ```
/// use reqflow::utils::cache_key;
/// use url::Url;
///
/// let url = Url::parse("HTTP://Example.com/a?b=1#frag").unwrap();
/// assert_eq!(cache_key(&url), "http://example.com/a?b=1");
/// ```
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Extract the filename from a `Content-Disposition` header
///
/// Handles both `filename="name.ext"` and the RFC 5987 form
/// `filename*=UTF-8''encoded%20name.ext` (the latter wins when both are
/// present). Directory components are stripped so the result is always a
/// bare file name.
pub fn filename_from_content_disposition(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;

    let mut plain = None;
    let mut extended = None;

    // Format: attachment; filename="file.bin" or filename*=UTF-8''file.bin
    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            // Format is: charset'lang'encoded-filename
            if let Some(idx) = encoded.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
            {
                extended = Some(decoded.into_owned());
            }
        } else if let Some(name) = part.strip_prefix("filename=") {
            plain = Some(name.trim_matches('"').to_string());
        }
    }

    extended.or(plain).and_then(|name| sanitize_filename(&name))
}

/// Reduce a server-supplied name to a safe bare file name
fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

/// First non-existing path derived from `path`
///
/// Returns `path` itself when free, otherwise `name (1).ext`, `name (2).ext`, ...
///
/// # Examples
///
/// ```
/// use reqflow::utils::unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/nonexistent-dir/report.pdf");
/// assert_eq!(unique_path(path).unwrap(), path);
/// ```
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Other(format!("cannot extract file stem from {}", path.display())))?;

    let extension = path.extension().and_then(|e| e.to_str());

    let parent = path.parent().ok_or_else(|| {
        Error::Other(format!(
            "cannot extract parent directory from {}",
            path.display()
        ))
    })?;

    // Try adding (1), (2), (3), ... until we find a unique name
    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::Other(format!(
        "could not find unique filename for {} after {} attempts",
        path.display(),
        MAX_RENAME_ATTEMPTS
    )))
}
