//! The top-level orchestrator.
//!
//! A [`Session`] owns the state that outlives a single call: the cookie jar,
//! default hooks, default headers, and the transport. `send` drives the full
//! pipeline per call:
//!
//! ```text
//! Request -> prepare (pre_request hooks, params, cookies, auth)
//!         -> pre_send hooks -> transport -> Response
//!         -> cookie extraction -> response hooks
//!         -> redirect resolution (loop) -> final Response with history
//! ```
//!
//! Concurrent calls on one session share the jar; jar access is serialized
//! by its mutex and the lock is never held across the transport await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::SessionConfig;
use crate::cookies::jar::CookieJar;
use crate::cookies::CookieJarHandle;
use crate::errors::{Error, Result};
use crate::hooks::Hooks;
use crate::params::Body;
use crate::redirect::{self, RedirectAction};
use crate::request::{self, Request};
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};

pub struct Session {
    config: SessionConfig,
    jar: CookieJarHandle,
    hooks: Hooks,
    transport: Arc<dyn Transport>,
}

impl Session {
    /// Creates a session over the bundled reqwest transport.
    pub fn new() -> Result<Self> {
        Ok(Session::with_transport(Arc::new(ReqwestTransport::new()?)))
    }

    /// Creates a session over an injected transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Session {
            config: SessionConfig::default(),
            jar: Arc::new(Mutex::new(CookieJar::new())),
            hooks: Hooks::new(),
            transport,
        }
    }

    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the session jar with an externally supplied one. The jar
    /// lives as long as every handle to it, so callers can share one jar
    /// between sessions.
    #[must_use]
    pub fn jar(mut self, jar: CookieJarHandle) -> Self {
        self.jar = jar;
        self
    }

    /// Handle to the session's cookie jar.
    pub fn cookie_jar(&self) -> CookieJarHandle {
        self.jar.clone()
    }

    /// Default hooks, applied to every call unless the request registers its
    /// own for the same event.
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub async fn get(&self, url: impl Into<String>) -> Result<Response> {
        self.send(Request::get(url)).await
    }

    pub async fn head(&self, url: impl Into<String>) -> Result<Response> {
        self.send(Request::head(url)).await
    }

    pub async fn post(&self, url: impl Into<String>) -> Result<Response> {
        self.send(Request::post(url)).await
    }

    /// Sends `request` and follows redirects, returning the final response
    /// with the full hop history attached.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let hooks = self.hooks.merged_with(&request.hooks);
        let allow_redirects = request.redirects_allowed();
        let timeout = request.timeout.or(self.config.timeout);
        let proxies: HashMap<String, String> = request.proxies.clone();

        let mut current = request;
        // Session defaults fill in; request-level headers win on conflict.
        for (name, value) in &self.config.headers {
            if !current.headers.contains_key(name) {
                current.headers.insert(name.clone(), value.clone());
            }
        }

        let mut history: Vec<Response> = Vec::new();

        loop {
            let prepared = {
                let jar = self.jar.lock().expect("cookie jar lock poisoned");
                request::prepare(
                    current.clone(),
                    Some(&jar),
                    self.config.base_url.as_ref(),
                    &hooks,
                )?
            };
            let prepared = Arc::new(hooks.dispatch_pre_send(prepared)?);

            log::debug!("sending {} {}", prepared.method, prepared.url);
            let start = Instant::now();
            let raw = self.transport.send(&prepared, timeout, &proxies).await?;
            let elapsed = start.elapsed();

            let mut response =
                Response::new(raw.status, raw.headers, prepared.url.clone(), raw.body);
            response.elapsed = elapsed;
            response.request = Some(prepared.clone());

            {
                let mut jar = self.jar.lock().expect("cookie jar lock poisoned");
                jar.extract_from_response(&response.url, &response.headers);
            }

            // Response hooks observe every hop, including intermediate ones.
            let response = hooks.dispatch_response(response)?;

            match redirect::resolve(&response, &prepared, allow_redirects) {
                RedirectAction::Done => {
                    let mut response = response;
                    response.history = history;
                    return Ok(response);
                }
                RedirectAction::Follow(follow) => {
                    if history.len() >= self.config.max_redirects {
                        return Err(Error::TooManyRedirects {
                            max: self.config.max_redirects,
                            history,
                        });
                    }
                    history.push(response);

                    current.method = follow.method.as_str().to_string();
                    current.url = follow.url.to_string();
                    // Params were already merged into the first hop's URL;
                    // the Location target is followed verbatim.
                    current.params.clear();
                    // Each hop is re-prepared from scratch, so per-hop
                    // cookies, auth, and hooks all re-apply.
                    if follow.drop_body {
                        current.body = Body::None;
                        current.files.clear();
                        current.headers.remove(http::header::CONTENT_TYPE);
                        current.headers.remove(http::header::CONTENT_LENGTH);
                        current.headers.remove(http::header::TRANSFER_ENCODING);
                    }
                    if follow.strip_auth {
                        current.auth = crate::auth::Auth::None;
                        current.headers.remove(http::header::AUTHORIZATION);
                    }
                }
            }
        }
    }
}
