//! Pipeline checkpoints and user hook dispatch.
//!
//! Hooks are plain callables registered against a [`HookEvent`]. They run in
//! registration order; each hook may return a replacement payload (which is
//! handed to the next hook and ultimately back to the pipeline) or `None` to
//! leave the payload untouched. A hook error aborts the in-flight call and
//! propagates to the caller of `Session::send`.
//!
//! There is no global registry. Hooks are explicit data carried on the
//! session (defaults) and on individual requests; when a request registers
//! hooks for an event, those take precedence over the session's for that
//! event.

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::errors::Result;
use crate::request::{PreparedRequest, Request};
use crate::response::Response;

/// A named pipeline checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// Before preparation, on the draft [`Request`].
    PreRequest,
    /// After preparation, before transport hand-off, on the [`PreparedRequest`].
    PreSend,
    /// After each hop's round trip, on the [`Response`] (including
    /// intermediate redirect hops).
    Response,
}

impl Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::PreRequest => write!(f, "pre_request"),
            HookEvent::PreSend => write!(f, "pre_send"),
            HookEvent::Response => write!(f, "response"),
        }
    }
}

/// A transform over an event payload. `Ok(None)` is the identity, `Ok(Some)`
/// replaces the payload, `Err` aborts the call.
pub type Hook<T> = Arc<dyn Fn(&T) -> Result<Option<T>> + Send + Sync>;

/// Ordered hook lists per event. Payload types differ per stage, so each
/// event keeps its own typed list.
#[derive(Clone, Default)]
pub struct Hooks {
    pre_request: Vec<Hook<Request>>,
    pre_send: Vec<Hook<PreparedRequest>>,
    response: Vec<Hook<Response>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_request", &self.pre_request.len())
            .field("pre_send", &self.pre_send.len())
            .field("response", &self.response.len())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Hooks::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pre_request.is_empty() && self.pre_send.is_empty() && self.response.is_empty()
    }

    pub fn on_pre_request<F>(&mut self, hook: F)
    where
        F: Fn(&Request) -> Result<Option<Request>> + Send + Sync + 'static,
    {
        self.pre_request.push(Arc::new(hook));
    }

    pub fn on_pre_send<F>(&mut self, hook: F)
    where
        F: Fn(&PreparedRequest) -> Result<Option<PreparedRequest>> + Send + Sync + 'static,
    {
        self.pre_send.push(Arc::new(hook));
    }

    pub fn on_response<F>(&mut self, hook: F)
    where
        F: Fn(&Response) -> Result<Option<Response>> + Send + Sync + 'static,
    {
        self.response.push(Arc::new(hook));
    }

    pub fn has_pre_request(&self) -> bool {
        !self.pre_request.is_empty()
    }

    pub fn has_pre_send(&self) -> bool {
        !self.pre_send.is_empty()
    }

    pub fn has_response(&self) -> bool {
        !self.response.is_empty()
    }

    /// Runs the `pre_request` chain over `payload`.
    pub fn dispatch_pre_request(&self, payload: Request) -> Result<Request> {
        dispatch(HookEvent::PreRequest, &self.pre_request, payload)
    }

    /// Runs the `pre_send` chain over `payload`.
    pub fn dispatch_pre_send(&self, payload: PreparedRequest) -> Result<PreparedRequest> {
        dispatch(HookEvent::PreSend, &self.pre_send, payload)
    }

    /// Runs the `response` chain over `payload`.
    pub fn dispatch_response(&self, payload: Response) -> Result<Response> {
        dispatch(HookEvent::Response, &self.response, payload)
    }

    /// Merges session defaults with per-request hooks. For each event, the
    /// request's list wins outright when non-empty.
    pub fn merged_with(&self, request_hooks: &Hooks) -> Hooks {
        Hooks {
            pre_request: if request_hooks.has_pre_request() {
                request_hooks.pre_request.clone()
            } else {
                self.pre_request.clone()
            },
            pre_send: if request_hooks.has_pre_send() {
                request_hooks.pre_send.clone()
            } else {
                self.pre_send.clone()
            },
            response: if request_hooks.has_response() {
                request_hooks.response.clone()
            } else {
                self.response.clone()
            },
        }
    }
}

/// Runs `hooks` in order over `payload`, threading replacements through.
fn dispatch<T>(event: HookEvent, hooks: &[Hook<T>], mut payload: T) -> Result<T> {
    for hook in hooks {
        if let Some(replacement) = hook(&payload)? {
            log::debug!("{event} hook replaced its payload");
            payload = replacement;
        }
    }
    Ok(payload)
}
