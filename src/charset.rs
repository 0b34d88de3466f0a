//! Charset resolution for string bodies

use encoding_rs::Encoding;

/// Encoding named by a `Content-Type` header value, or the fallback
///
/// An absent header, an unparsable media type, a missing `charset`
/// parameter and an unknown label all fall back. An unknown fallback label
/// resolves to UTF-8.
pub fn resolve_charset(content_type: Option<&str>, fallback: &str) -> &'static Encoding {
    content_type
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .and_then(|mime| {
            mime.get_param(mime::CHARSET)
                .and_then(|charset| Encoding::for_label(charset.as_str().as_bytes()))
        })
        .or_else(|| Encoding::for_label(fallback.trim().as_bytes()))
        .unwrap_or(encoding_rs::UTF_8)
}

/// Decode `bytes` with `encoding`, replacing malformed sequences
///
/// A byte order mark overrides `encoding`.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "malformed bytes replaced while decoding body");
    }
    text.into_owned()
}
