//! Authentication strategies.
//!
//! Auth is a closed capability: something that can transform an in-progress
//! [`PreparedRequest`](crate::request::PreparedRequest). Basic auth is a
//! username/password pair encoded into an `Authorization` header; custom
//! strategies are arbitrary transforms and may set any headers they like
//! (signing schemes, tokens, and so on).

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use http::HeaderValue;

use crate::errors::{Error, Result};
use crate::request::PreparedRequest;

/// A custom auth transform over the in-progress prepared request.
pub type AuthTransform = Arc<dyn Fn(&mut PreparedRequest) -> Result<()> + Send + Sync>;

#[derive(Clone, Default)]
pub enum Auth {
    /// No credentials.
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic { username: String, password: String },
    /// A pluggable signing strategy.
    Custom(AuthTransform),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "Auth::None"),
            Auth::Basic { username, .. } => write!(f, "Auth::Basic({username})"),
            Auth::Custom(_) => write!(f, "Auth::Custom"),
        }
    }
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn custom<F>(transform: F) -> Self
    where
        F: Fn(&mut PreparedRequest) -> Result<()> + Send + Sync + 'static,
    {
        Auth::Custom(Arc::new(transform))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Auth::None)
    }

    /// Applies this strategy to `prepared`. Basic auth only injects its
    /// header when the caller has not already set `Authorization`; custom
    /// transforms run unconditionally.
    pub fn apply(&self, prepared: &mut PreparedRequest) -> Result<()> {
        match self {
            Auth::None => Ok(()),
            Auth::Basic { username, password } => {
                if prepared.headers.contains_key(http::header::AUTHORIZATION) {
                    return Ok(());
                }
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                let value = HeaderValue::from_str(&format!("Basic {encoded}"))
                    .map_err(|e| Error::Encoding(format!("invalid Basic auth header: {e}")))?;
                prepared.headers.insert(http::header::AUTHORIZATION, value);
                Ok(())
            }
            Auth::Custom(transform) => transform(prepared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    fn prepared() -> PreparedRequest {
        Request::get("http://example.com").prepare_without_jar().unwrap()
    }

    #[test]
    fn basic_auth_sets_authorization_header() {
        let mut p = prepared();
        Auth::basic("user", "pass").apply(&mut p).unwrap();

        // "user:pass" -> dXNlcjpwYXNz
        assert_eq!(
            p.headers.get(http::header::AUTHORIZATION).unwrap(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn explicit_authorization_header_wins_over_basic() {
        let mut p = prepared();
        p.headers.insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("Bearer token"),
        );
        Auth::basic("user", "pass").apply(&mut p).unwrap();

        assert_eq!(p.headers.get(http::header::AUTHORIZATION).unwrap(), "Bearer token");
    }

    #[test]
    fn custom_auth_may_set_arbitrary_headers() {
        let mut p = prepared();
        let auth = Auth::custom(|prepared| {
            prepared.headers.insert(
                http::HeaderName::from_static("x-signature"),
                http::HeaderValue::from_static("deadbeef"),
            );
            Ok(())
        });
        auth.apply(&mut p).unwrap();

        assert_eq!(p.headers.get("x-signature").unwrap(), "deadbeef");
    }
}
