//! The cookie jar and its bidirectional request/response sync.
//!
//! A jar holds every cookie a session has accumulated, keyed by
//! `(domain, path, name)`. Two operations move cookies across the pipeline:
//!
//! - [`CookieJar::apply_to_request`] selects the entries that match an
//!   outgoing URL and renders the `Cookie` request header value.
//! - [`CookieJar::extract_from_response`] parses every `Set-Cookie` response
//!   line independently and updates the jar. Malformed lines are skipped,
//!   never fatal; an already-expired cookie is a deletion, not an insertion.
//!
//! ## Matching rules
//! - Domain: exact host match always; parent-domain match (`host` ends with
//!   `.domain`) only for cookies that carried an explicit `Domain` attribute.
//! - Path: the cookie path must be a prefix of the request path on a path
//!   segment boundary.
//! - `Secure` cookies are withheld unless the request scheme is https.
//! - When two matching cookies share a name, the more path-specific one wins.
//!   At equal specificity the jar's insertion order decides, first match
//!   wins. Setting the same `(domain, path, name)` replaces in place, so a
//!   true duplicate is always the most recently stored value.

use chrono::{DateTime, FixedOffset, Utc};
use http::HeaderMap;
use url::Url;

use crate::cookies::Cookie;

/// In-memory cookie store shared by a session across calls.
///
/// Entries live in insertion order; that order is part of the deterministic
/// tie-breaking contract described at the module level.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: Vec<Cookie>,
}

/// Derives the default cookie path from a request URL path, per RFC 6265
/// §5.1.4: everything up to the rightmost `/`, or `/` when that is empty.
fn default_path(url_path: &str) -> &str {
    match url_path.rsplit_once('/') {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => "/",
    }
}

fn domain_matches(cookie: &Cookie, host: &str) -> bool {
    if host.eq_ignore_ascii_case(&cookie.domain) {
        return true;
    }
    if cookie.host_only {
        return false;
    }
    let suffix = format!(".{}", cookie.domain);
    host.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase())
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if !request_path.starts_with(cookie_path) {
        return false;
    }
    request_path.len() == cookie_path.len()
        || cookie_path.ends_with('/')
        || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/')
}

/// Parses a cookie `Expires` date (RFC 1123 style, e.g.
/// `Tue, 01 Jan 2030 00:00:00 GMT`). Unparsable dates yield `None` and the
/// cookie is treated as a session cookie.
fn parse_expires(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(raw).ok()
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        CookieJar::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all cookies.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over all stored cookies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.entries.iter()
    }

    /// Convenience lookup of the first cookie with `name`, any scope.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.entries.iter().find(|c| c.name == name)
    }

    /// Stores `cookie`, replacing any existing entry with the same
    /// `(domain, path, name)` key in place.
    pub fn set(&mut self, cookie: Cookie) {
        match self.entries.iter_mut().find(|c| {
            c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path
        }) {
            Some(existing) => *existing = cookie,
            None => self.entries.push(cookie),
        }
    }

    /// Removes the entry with the exact `(domain, path, name)` key.
    pub fn remove(&mut self, domain: &str, path: &str, name: &str) {
        self.entries
            .retain(|c| !(c.name == name && c.domain == domain && c.path == path));
    }

    /// Selects the jar entries matching `url`, merges in request-level
    /// `overrides` (which win on name collision), and renders the `Cookie`
    /// request header value. `None` means nothing matched.
    pub fn apply_to_request(&self, url: &Url, overrides: &[(String, String)]) -> Option<String> {
        let host = url.host_str().unwrap_or_default();
        let request_path = url.path();
        let is_https = url.scheme() == "https";

        let mut candidates: Vec<&Cookie> = self
            .entries
            .iter()
            .filter(|c| domain_matches(c, host))
            .filter(|c| path_matches(&c.path, request_path))
            .filter(|c| !c.secure || is_https)
            .collect();

        // Stable sort: insertion order survives among equal path lengths.
        candidates.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        let mut pairs: Vec<(String, String)> = overrides.to_vec();
        for cookie in candidates {
            if pairs.iter().any(|(name, _)| *name == cookie.name) {
                continue;
            }
            pairs.push((cookie.name.clone(), cookie.value.clone()));
        }

        if pairs.is_empty() {
            return None;
        }
        Some(
            pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Parses every `Set-Cookie` line in `headers` and updates the jar.
    ///
    /// Each line is handled independently; a malformed line is logged and
    /// skipped without aborting the rest. A cookie whose `Expires` is in the
    /// past or whose `Max-Age` is zero/negative deletes the matching entry.
    pub fn extract_from_response(&mut self, url: &Url, headers: &HeaderMap) {
        let host = url.host_str().unwrap_or_default();

        for header in headers.get_all(http::header::SET_COOKIE) {
            let line = match header.to_str() {
                Ok(s) => s,
                Err(_) => {
                    log::warn!("skipping non-ASCII Set-Cookie header from {host}");
                    continue;
                }
            };
            match self.parse_set_cookie(line, host, url.path()) {
                Some((cookie, expired)) => {
                    if expired {
                        log::debug!("expired Set-Cookie deletes {}={}", cookie.name, cookie.value);
                        self.remove(&cookie.domain, &cookie.path, &cookie.name);
                    } else {
                        self.set(cookie);
                    }
                }
                None => {
                    log::warn!("skipping malformed Set-Cookie line from {host}: {line:?}");
                }
            }
        }
    }

    /// Parses one `Set-Cookie` line. Returns the cookie and whether it was
    /// already expired, or `None` when the line is malformed.
    fn parse_set_cookie(&self, line: &str, host: &str, url_path: &str) -> Option<(Cookie, bool)> {
        let mut parts = line.split(';');

        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain: host.to_string(),
            path: String::new(),
            host_only: true,
            secure: false,
            http_only: false,
            expires: None,
            same_site: None,
        };
        let mut expired = false;

        for part in parts {
            let part = part.trim();
            if let Some((k, v)) = part.split_once('=') {
                let v = v.trim();
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" => cookie.path = v.to_string(),
                    "domain" => {
                        cookie.domain = v.trim_start_matches('.').to_string();
                        cookie.host_only = false;
                    }
                    "expires" => {
                        cookie.expires = Some(v.to_string());
                        if let Some(when) = parse_expires(v) {
                            if when < Utc::now() {
                                expired = true;
                            }
                        }
                    }
                    "max-age" => {
                        if let Ok(seconds) = v.parse::<i64>() {
                            if seconds <= 0 {
                                expired = true;
                            }
                        }
                    }
                    "samesite" => {
                        let normalized = if v.eq_ignore_ascii_case("lax") {
                            "Lax"
                        } else if v.eq_ignore_ascii_case("strict") {
                            "Strict"
                        } else if v.eq_ignore_ascii_case("none") {
                            "None"
                        } else {
                            v
                        };
                        cookie.same_site = Some(normalized.to_string());
                    }
                    _ => {}
                }
            } else if part.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if part.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        if cookie.path.is_empty() {
            cookie.path = default_path(url_path).to_string();
        }

        Some((cookie, expired))
    }
}
