//! Buffered HTTP response with lazy text decoding and redirect history.
//!
//! A [`Response`] is produced by the transport and decorated by the pipeline:
//! elapsed time, the originating prepared request, and — for the final
//! response of a call — the chronological chain of intermediate redirect
//! responses in `history`.
//!
//! Encoding detection and text decoding are lazy: computed on first access,
//! cached for the lifetime of the response, and total (they never fail, even
//! for bytes invalid in every known encoding).

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use http::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

use crate::cookies::jar::CookieJar;
use crate::cookies::Cookie;
use crate::encoding;
use crate::errors::{Error, Result};
use crate::request::PreparedRequest;

/// Statuses that trigger redirect resolution when a `Location` header is
/// present.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

#[derive(Debug)]
pub struct Response {
    /// Numeric HTTP status code.
    pub status: u16,

    /// Response headers, case-insensitive.
    pub headers: HeaderMap,

    /// URL this response was received from.
    pub url: Url,

    /// Raw body bytes.
    pub content: Vec<u8>,

    /// The prepared request that produced this response.
    pub request: Option<Arc<PreparedRequest>>,

    /// Prior responses in the redirect chain, earliest first. Never contains
    /// this response itself. Empty outside redirect chains.
    pub history: Vec<Response>,

    /// Wall-clock duration of the transport round trip.
    pub elapsed: Duration,

    /// Fallback encoding assumed when neither headers nor content declare
    /// one.
    pub apparent_encoding: String,

    detected_encoding: OnceLock<String>,
    text: OnceLock<String>,
}

impl Clone for Response {
    fn clone(&self) -> Self {
        let clone_cell = |cell: &OnceLock<String>| {
            let fresh = OnceLock::new();
            if let Some(v) = cell.get() {
                let _ = fresh.set(v.clone());
            }
            fresh
        };
        Response {
            status: self.status,
            headers: self.headers.clone(),
            url: self.url.clone(),
            content: self.content.clone(),
            request: self.request.clone(),
            history: self.history.clone(),
            elapsed: self.elapsed,
            apparent_encoding: self.apparent_encoding.clone(),
            detected_encoding: clone_cell(&self.detected_encoding),
            text: clone_cell(&self.text),
        }
    }
}

impl Response {
    /// Builds a response around transport output. History, elapsed, and the
    /// request back-reference are filled in by the session.
    pub fn new(status: u16, headers: HeaderMap, url: Url, content: Vec<u8>) -> Self {
        Response {
            status,
            headers,
            url,
            content,
            request: None,
            history: Vec::new(),
            elapsed: Duration::ZERO,
            apparent_encoding: "utf-8".to_string(),
            detected_encoding: OnceLock::new(),
            text: OnceLock::new(),
        }
    }

    /// Human-readable reason phrase; `"Unknown"` for non-standard codes.
    pub fn status_text(&self) -> &'static str {
        http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this response carries a redirect status and a `Location`
    /// header.
    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
            && self.headers.contains_key(http::header::LOCATION)
    }

    /// The text encoding of the body, detected on first access and cached.
    ///
    /// Cascade: `Content-Type` charset parameter, then a meta declaration in
    /// the body, then [`Response::apparent_encoding`].
    pub fn encoding(&self) -> &str {
        self.detected_encoding
            .get_or_init(|| encoding::detect(&self.headers, &self.content, &self.apparent_encoding))
    }

    /// The body decoded as text, computed on first access and cached.
    ///
    /// Always succeeds: invalid byte sequences are replaced rather than
    /// surfaced as errors.
    pub fn text(&self) -> &str {
        self.text
            .get_or_init(|| encoding::decode(&self.content, self.encoding()))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.content)
            .map_err(|e| Error::Encoding(format!("JSON body decode failed: {e}")))
    }

    /// Cookies set by this response, parsed from its `Set-Cookie` headers.
    /// Malformed lines are skipped.
    pub fn cookies(&self) -> Vec<Cookie> {
        let mut jar = CookieJar::new();
        jar.extract_from_response(&self.url, &self.headers);
        jar.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> Response {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.append(
                http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        Response::new(
            status,
            map,
            Url::parse("http://example.com/").unwrap(),
            body.to_vec(),
        )
    }

    #[test]
    fn encoding_from_content_type_header() {
        let r = response(
            200,
            &[("content-type", "text/html; charset=iso-8859-1")],
            b"<html></html>",
        );
        assert_eq!(r.encoding(), "iso-8859-1");
    }

    #[test]
    fn encoding_from_meta_tag() {
        let r = response(200, &[], br#"<meta charset="utf-8"><p>hi</p>"#);
        assert_eq!(r.encoding(), "utf-8");
    }

    #[test]
    fn encoding_falls_back_without_declarations() {
        let r = response(200, &[], &[0xff, 0xfe, 0x00]);
        assert_eq!(r.encoding(), "utf-8");
        // text access stays total even for undecodable content
        assert!(!r.text().is_empty());
    }

    #[test]
    fn encoding_is_cached_across_calls() {
        let r = response(
            200,
            &[("content-type", "text/plain; charset=utf-8")],
            b"body",
        );
        let first = r.encoding() as *const str;
        let second = r.encoding() as *const str;
        assert_eq!(first, second);
    }

    #[test]
    fn text_decodes_with_detected_encoding() {
        let r = response(
            200,
            &[("content-type", "text/plain; charset=iso-8859-1")],
            &[0x63, 0x61, 0x66, 0xe9],
        );
        assert_eq!(r.text(), "café");
    }

    #[test]
    fn json_body_decodes() {
        let r = response(200, &[], br#"{"ok": true, "count": 3}"#);
        let value: serde_json::Value = r.json().unwrap();
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn json_error_on_invalid_body() {
        let r = response(200, &[], b"not json");
        assert!(matches!(r.json::<serde_json::Value>(), Err(Error::Encoding(_))));
    }

    #[test]
    fn redirect_requires_location_header() {
        assert!(response(302, &[("location", "/next")], b"").is_redirect());
        assert!(!response(302, &[], b"").is_redirect());
        assert!(!response(200, &[("location", "/next")], b"").is_redirect());
    }

    #[test]
    fn response_cookies_parsed_from_set_cookie() {
        let r = response(200, &[("set-cookie", "a=1"), ("set-cookie", "b=2")], b"");
        let names: Vec<_> = r.cookies().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
