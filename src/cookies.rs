//! Cookie types and the shared jar handle.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<Mutex<CookieJar>>`. The jar is shared by a
//!   `Session` across calls; both merge directions
//!   ([`CookieJar::apply_to_request`] and [`CookieJar::extract_from_response`])
//!   run under the lock so concurrent calls never interleave a read and a
//!   write to the same entry.
//! - The lock is only held across jar access, never across a transport await.
//!
//! The [`Cookie`] struct is (de)serializable via `serde` for persistence or
//! inspection.

pub mod jar;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

pub use jar::CookieJar;

/// A handle to a cookie jar shared between a session and its callers.
pub type CookieJarHandle = Arc<Mutex<CookieJar>>;

/// A cookie as stored in the jar.
///
/// `domain` and `path` are always populated: when a `Set-Cookie` line omits
/// them they are derived from the request URL at extraction time. The jar is
/// keyed by `(domain, path, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Domain the cookie is scoped to, without a leading dot.
    pub domain: String,

    /// Path scoping (e.g. `"/"` or `"/account"`).
    pub path: String,

    /// If `true`, the cookie came without a `Domain` attribute and matches
    /// only its exact host, never subdomains.
    pub host_only: bool,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// If `true`, cookie is flagged as inaccessible to client-side scripts.
    pub http_only: bool,

    /// Raw `Expires` attribute, if any. Session cookies have `None`.
    pub expires: Option<String>,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    pub same_site: Option<String>,
}

impl Cookie {
    /// Creates a session cookie scoped to `domain` and `path`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            host_only: false,
            secure: false,
            http_only: false,
            expires: None,
            same_site: None,
        }
    }
}
