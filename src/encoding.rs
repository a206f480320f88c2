//! Text-encoding detection for response bodies.
//!
//! Detection is a prioritized cascade, first success wins:
//!
//! 1. the `charset` parameter of the `Content-Type` response header,
//! 2. the first `<meta charset=...>`-style declaration in the leading bytes
//!    of the body,
//! 3. the caller-supplied fallback.
//!
//! Decoding never fails: unknown labels degrade to the fallback and invalid
//! byte sequences are replaced, so `Response::text` stays total.

use http::HeaderMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches `<meta charset="utf-8">` as well as the legacy
    /// `<meta http-equiv="Content-Type" content="text/html; charset=...">`
    /// spelling.
    static ref META_CHARSET: Regex =
        Regex::new(r#"(?i)<meta[^>]*?charset=["']*([a-zA-Z0-9_\-]+)"#).unwrap();
}

/// How many leading body bytes are scanned for a meta declaration.
const META_SCAN_WINDOW: usize = 1024;

/// Extracts the `charset` parameter from a `Content-Type` header, if any.
pub fn encoding_from_headers(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(http::header::CONTENT_TYPE)?.to_str().ok()?;
    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("charset") {
            return Some(value.trim().trim_matches(['"', '\'']).to_string());
        }
    }
    None
}

/// Finds the first meta-charset declaration in the leading bytes of `content`.
///
/// The window is decoded lossily so the scan itself cannot fail on arbitrary
/// bytes.
pub fn encoding_from_content(content: &[u8]) -> Option<String> {
    let window = &content[..content.len().min(META_SCAN_WINDOW)];
    let text = String::from_utf8_lossy(window);
    META_CHARSET
        .captures(&text)
        .map(|caps| caps[1].to_string())
}

/// Runs the full cascade. `fallback` is the transport's apparent/default
/// encoding and is returned verbatim when neither the headers nor the body
/// declare one.
pub fn detect(headers: &HeaderMap, content: &[u8], fallback: &str) -> String {
    if let Some(encoding) = encoding_from_headers(headers) {
        return encoding;
    }
    if let Some(encoding) = encoding_from_content(content) {
        return encoding;
    }
    fallback.to_string()
}

/// Decodes `content` with the encoding named by `label`, replacing invalid
/// sequences. Unknown labels degrade to lossy UTF-8. Never fails.
pub fn decode(content: &[u8], label: &str) -> String {
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            let (text, _, had_errors) = encoding.decode(content);
            if had_errors {
                log::debug!("replacement characters while decoding as {label}");
            }
            text.into_owned()
        }
        None => {
            log::debug!("unknown encoding label {label:?}, decoding as lossy UTF-8");
            String::from_utf8_lossy(content).into_owned()
        }
    }
}
