//! Request intent and preparation.
//!
//! A [`Request`] is the user-facing, mutable description of what to send. A
//! [`PreparedRequest`] is the frozen, wire-ready form: absolute URL with the
//! query string merged in, the final header set, and the encoded body.
//! Preparation is the pipeline stage that bridges the two, folding in query
//! params, body encoding, jar cookies, and auth.
//!
//! Once returned, a `PreparedRequest` is not mutated further by the pipeline
//! (only `pre_send` hooks may replace it wholesale); re-sending one yields
//! byte-identical wire output given identical cookie and auth state.

use std::collections::HashMap;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::auth::Auth;
use crate::cookies::jar::CookieJar;
use crate::errors::{Error, Result};
use crate::hooks::Hooks;
use crate::params::{self, Body, FieldValue, Fields, FilePart};

/// A declarative, mutable HTTP request.
///
/// `method` and `url` may be empty only in a draft state prior to explicit
/// assignment; preparation rejects drafts. All other fields are optional.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// HTTP method, case-insensitive. Normalized to upper-case at prepare
    /// time.
    pub method: String,
    /// Target URL, possibly relative to a session base.
    pub url: String,
    /// Extra headers. Explicit caller headers always win over derived ones.
    pub headers: HeaderMap,
    /// Query parameters, merged (appended) into the URL's query component.
    pub params: Fields,
    /// Request body.
    pub body: Body,
    /// File parts. Non-empty `files` switches the body to multipart.
    pub files: Vec<FilePart>,
    /// Request-level cookie overrides, merged over jar matches.
    pub cookies: Vec<(String, String)>,
    /// Credentials or signing strategy.
    pub auth: Auth,
    /// Per-request hooks; take precedence over session defaults per event.
    pub hooks: Hooks,
    /// Per-request timeout, overriding the session default.
    pub timeout: Option<Duration>,
    /// Proxy URL per scheme, handed to the transport.
    pub proxies: HashMap<String, String>,
    /// Redirect-following override. `None` falls back to the method default
    /// (true for GET/HEAD, false otherwise).
    pub allow_redirects: Option<bool>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Request {
            method: method.into(),
            url: url.into(),
            ..Request::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Request::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Request::new("POST", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Request::new("PUT", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Request::new("DELETE", url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Request::new("HEAD", url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Request::new("PATCH", url)
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: impl AsRef<str>) -> Self {
        if let Ok(value) = HeaderValue::from_str(value.as_ref()) {
            self.headers.insert(name, value);
        }
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Sets an ordered form body. Encoded as urlencoded pairs, or folded into
    /// a multipart payload when file parts are present.
    #[must_use]
    pub fn form(mut self, fields: Fields) -> Self {
        self.body = Body::Fields(fields);
        self
    }

    /// Sets a pre-formed body, passed through byte-for-byte.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Raw(body.into());
        self
    }

    #[must_use]
    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = Some(allow);
        self
    }

    /// Whether redirects are followed for this request: the explicit override
    /// when set, otherwise true only for GET and HEAD.
    pub fn redirects_allowed(&self) -> bool {
        match self.allow_redirects {
            Some(allow) => allow,
            None => {
                let method = self.method.to_ascii_uppercase();
                method == "GET" || method == "HEAD"
            }
        }
    }

    /// Prepares this request with no jar, base URL, or hooks. Convenience
    /// for tests and one-shot callers.
    pub fn prepare_without_jar(&self) -> Result<PreparedRequest> {
        prepare(self.clone(), None, None, &Hooks::new())
    }
}

/// A frozen, transport-ready request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    /// Fully resolved absolute URL, query string merged in.
    pub url: Url,
    pub headers: HeaderMap,
    /// Encoded body bytes. Empty for bodiless requests.
    pub body: Vec<u8>,
}

impl PreparedRequest {
    /// Host component of the resolved URL. Used for cross-host redirect
    /// policy decisions.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

/// Transforms `request` into a [`PreparedRequest`].
///
/// Pipeline order: `pre_request` hooks → URL resolution → query merge →
/// body encoding → cookie header → auth. See the module docs for the
/// freezing contract.
pub fn prepare(
    request: Request,
    jar: Option<&CookieJar>,
    base_url: Option<&Url>,
    hooks: &Hooks,
) -> Result<PreparedRequest> {
    // A hook may replace the draft request wholesale.
    let request = hooks.dispatch_pre_request(request)?;

    if request.method.is_empty() {
        return Err(Error::InvalidUrl("request has no method".to_string()));
    }
    let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidUrl(format!("invalid method {:?}", request.method)))?;

    let mut url = resolve_url(&request.url, base_url)?;

    // Existing query entries are preserved; params are appended, never
    // deduplicated.
    if !request.params.is_empty() {
        let pairs = params::flatten_fields(&request.params);
        let mut serializer = url.query_pairs_mut();
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        drop(serializer);
    }

    let mut headers = request.headers.clone();
    let body = encode_body(&request, &mut headers)?;

    if !body.is_empty() && !headers.contains_key(http::header::CONTENT_LENGTH) {
        headers.insert(
            http::header::CONTENT_LENGTH,
            HeaderValue::from_str(&body.len().to_string())
                .map_err(|e| Error::Encoding(e.to_string()))?,
        );
    }

    // Explicit caller Cookie headers win over jar-derived ones.
    if !headers.contains_key(http::header::COOKIE) {
        let jar_header = match jar {
            Some(jar) => jar.apply_to_request(&url, &request.cookies),
            None if !request.cookies.is_empty() => Some(
                request
                    .cookies
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            None => None,
        };
        if let Some(value) = jar_header {
            headers.insert(
                http::header::COOKIE,
                HeaderValue::from_str(&value)
                    .map_err(|e| Error::Encoding(format!("invalid cookie header: {e}")))?,
            );
        }
    }

    let mut prepared = PreparedRequest {
        method,
        url,
        headers,
        body,
    };
    request.auth.apply(&mut prepared)?;

    log::debug!("prepared {} {}", prepared.method, prepared.url);
    Ok(prepared)
}

fn resolve_url(raw: &str, base_url: Option<&Url>) -> Result<Url> {
    if raw.is_empty() {
        return Err(Error::InvalidUrl("request has no URL".to_string()));
    }
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
            Some(base) => base
                .join(raw)
                .map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?,
            None => {
                return Err(Error::InvalidUrl(format!(
                    "{raw}: relative URL without a configured base"
                )))
            }
        },
        Err(e) => return Err(Error::InvalidUrl(format!("{raw}: {e}"))),
    };
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(Error::MissingScheme(url.to_string())),
    }
}

/// Encodes the request body and sets `Content-Type` unless the caller
/// already did.
fn encode_body(request: &Request, headers: &mut HeaderMap) -> Result<Vec<u8>> {
    let empty_fields: Fields = Vec::new();

    if !request.files.is_empty() {
        let fields = match &request.body {
            Body::Fields(fields) => fields,
            Body::None => &empty_fields,
            Body::Raw(_) => {
                return Err(Error::Encoding(
                    "cannot combine a raw body with file parts".to_string(),
                ))
            }
        };
        let (boundary, body) = params::encode_multipart(fields, &request.files)?;
        set_content_type_if_absent(
            headers,
            &format!("multipart/form-data; boundary={boundary}"),
        )?;
        return Ok(body);
    }

    match &request.body {
        Body::None => Ok(Vec::new()),
        Body::Fields(fields) => {
            let (_, encoded) = params::encode_params(fields);
            set_content_type_if_absent(headers, "application/x-www-form-urlencoded")?;
            Ok(encoded.into_bytes())
        }
        Body::Raw(bytes) => Ok(bytes.clone()),
    }
}

fn set_content_type_if_absent(headers: &mut HeaderMap, value: &str) -> Result<()> {
    if !headers.contains_key(http::header::CONTENT_TYPE) {
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_str(value).map_err(|e| Error::Encoding(e.to_string()))?,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::Cookie;

    #[test]
    fn resolves_absolute_url_and_normalizes_method() {
        let p = Request::new("get", "http://example.com/foo/bar")
            .prepare_without_jar()
            .unwrap();
        assert_eq!(p.method, Method::GET);
        assert_eq!(p.url.as_str(), "http://example.com/foo/bar");
    }

    #[test]
    fn relative_url_joins_against_base() {
        let base = Url::parse("http://example.com/api/").unwrap();
        let p = prepare(Request::get("v1/items"), None, Some(&base), &Hooks::new()).unwrap();
        assert_eq!(p.url.as_str(), "http://example.com/api/v1/items");
    }

    #[test]
    fn relative_url_without_base_is_invalid() {
        let err = Request::get("v1/items").prepare_without_jar().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = Request::get("ftp://example.com/file").prepare_without_jar().unwrap_err();
        assert!(matches!(err, Error::MissingScheme(_)));
    }

    #[test]
    fn draft_request_is_rejected() {
        let err = Request::default().prepare_without_jar().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn params_append_to_existing_query() {
        let p = Request::get("http://example.com/search?q=keep")
            .param("page", "2")
            .param("q", "more")
            .prepare_without_jar()
            .unwrap();
        assert_eq!(p.url.query(), Some("q=keep&page=2&q=more"));
    }

    #[test]
    fn form_body_is_urlencoded_with_content_type() {
        let p = Request::post("http://example.com/submit")
            .form(vec![
                ("a".to_string(), FieldValue::from("1")),
                ("b".to_string(), FieldValue::from("two words")),
            ])
            .prepare_without_jar()
            .unwrap();
        assert_eq!(p.body, b"a=1&b=two+words");
        assert_eq!(
            p.headers.get(http::header::CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(p.headers.get(http::header::CONTENT_LENGTH).unwrap(), "15");
    }

    #[test]
    fn explicit_content_type_wins() {
        let p = Request::post("http://example.com/submit")
            .header(http::header::CONTENT_TYPE, "text/plain")
            .form(vec![("a".to_string(), FieldValue::from("1"))])
            .prepare_without_jar()
            .unwrap();
        assert_eq!(p.headers.get(http::header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn raw_body_passes_through() {
        let p = Request::post("http://example.com/submit")
            .body(b"already=encoded&do-not=touch".to_vec())
            .prepare_without_jar()
            .unwrap();
        assert_eq!(p.body, b"already=encoded&do-not=touch");
        assert!(p.headers.get(http::header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn files_switch_body_to_multipart() {
        let p = Request::post("http://example.com/upload")
            .form(vec![("desc".to_string(), FieldValue::from("notes"))])
            .file(FilePart {
                name: "f".to_string(),
                filename: Some("notes.txt".to_string()),
                content_type: None,
                content: b"contents".to_vec(),
            })
            .prepare_without_jar()
            .unwrap();
        let content_type = p.headers.get(http::header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8(p.body).unwrap();
        assert!(body.contains("name=\"desc\""));
        assert!(body.contains("name=\"f\"; filename=\"notes.txt\""));
    }

    #[test]
    fn jar_cookie_becomes_cookie_header() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("sid", "abc", "example.com", "/"));

        let p = prepare(Request::get("http://example.com"), Some(&jar), None, &Hooks::new())
            .unwrap();
        assert_eq!(p.headers.get(http::header::COOKIE).unwrap(), "sid=abc");
    }

    #[test]
    fn explicit_cookie_header_wins_over_jar() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("sid", "abc", "example.com", "/"));

        let p = prepare(
            Request::get("http://example.com").header(http::header::COOKIE, "manual=1"),
            Some(&jar),
            None,
            &Hooks::new(),
        )
        .unwrap();
        assert_eq!(p.headers.get(http::header::COOKIE).unwrap(), "manual=1");
    }

    #[test]
    fn preparation_is_idempotent_for_fixed_bodies() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("sid", "abc", "example.com", "/"));

        let request = Request::post("http://example.com/submit?x=1")
            .param("y", "2")
            .form(vec![("a".to_string(), FieldValue::from("1"))])
            .auth(Auth::basic("user", "pass"));

        let first = prepare(request.clone(), Some(&jar), None, &Hooks::new()).unwrap();
        let second = prepare(request, Some(&jar), None, &Hooks::new()).unwrap();

        assert_eq!(first.url, second.url);
        assert_eq!(first.body, second.body);
        assert_eq!(first.headers, second.headers);
        assert_eq!(first.method, second.method);
    }

    #[test]
    fn pre_request_hook_can_replace_request() {
        let mut hooks = Hooks::new();
        hooks.on_pre_request(|r| {
            let mut r = r.clone();
            r.url = "http://replaced.example.com/".to_string();
            Ok(Some(r))
        });

        let p = prepare(Request::get("http://example.com"), None, None, &hooks).unwrap();
        assert_eq!(p.url.as_str(), "http://replaced.example.com/");
    }

    #[test]
    fn redirect_default_depends_on_method() {
        assert!(Request::get("http://example.com").redirects_allowed());
        assert!(Request::head("http://example.com").redirects_allowed());
        assert!(!Request::post("http://example.com").redirects_allowed());
        assert!(Request::post("http://example.com")
            .allow_redirects(true)
            .redirects_allowed());
    }
}
