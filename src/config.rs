use std::time::Duration;

use http::HeaderMap;
use url::Url;

/// Engine-tunable options carried by a [`Session`](crate::session::Session).
///
/// All fields have workable defaults; construct with `SessionConfig::default()`
/// and override what you need.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL that relative request URLs are joined against. If `None`,
    /// a relative URL is an error.
    pub base_url: Option<Url>,

    /// Maximum number of redirect hops followed per call before the chain
    /// is aborted with `TooManyRedirects`.
    pub max_redirects: usize,

    /// Default per-request timeout handed to the transport. A request-level
    /// timeout overrides this.
    pub timeout: Option<Duration>,

    /// Headers merged into every request. Request-level headers win on
    /// conflict.
    pub headers: HeaderMap,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            base_url: None,
            max_redirects: 30,
            timeout: None,
            headers: HeaderMap::new(),
        }
    }
}
