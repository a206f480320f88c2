//! Redirect resolution.
//!
//! After each hop the session asks the resolver what to do next. A response
//! triggers a follow-up when its status is one of the standard redirect codes
//! *and* it carries a `Location` header *and* the call allows redirects;
//! anything else terminates the chain. An unresolvable `Location` is treated
//! as "no redirect triggered" rather than an error, so the response is
//! returned as final.
//!
//! Method handling follows legacy browser behavior: 301/302/303 downgrade a
//! non-GET/HEAD request to a bodiless GET, while 307/308 preserve method and
//! body verbatim. When the target host differs from the current one, the
//! follow-up must not carry `Authorization` (credential leakage prevention);
//! the hop cap itself is enforced by the session, which owns the history.

use http::Method;
use url::Url;

use crate::request::PreparedRequest;
use crate::response::Response;

/// What the session should do after a completed hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
    /// Issue another hop.
    Follow(FollowUp),
    /// The chain is finished; the last response is final.
    Done,
}

/// Instructions for the next hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    /// Method for the next hop (possibly downgraded to GET).
    pub method: Method,
    /// Absolute target URL, resolved against the prior response's URL.
    pub url: Url,
    /// Drop the request body and its body-describing headers.
    pub drop_body: bool,
    /// Strip `Authorization` and stored credentials: the target host differs
    /// from the current one.
    pub strip_auth: bool,
}

/// Statuses that downgrade a non-GET/HEAD method to GET.
const DOWNGRADE_STATUSES: [u16; 3] = [301, 302, 303];

/// Decides whether `response` triggers a follow-up hop from `prepared`.
pub fn resolve(
    response: &Response,
    prepared: &PreparedRequest,
    allow_redirects: bool,
) -> RedirectAction {
    if !allow_redirects || !response.is_redirect() {
        return RedirectAction::Done;
    }

    let location = match response
        .headers
        .get(http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(value) => value,
        None => {
            log::warn!("redirect {} carried a non-ASCII Location, ending chain", response.status);
            return RedirectAction::Done;
        }
    };

    // May be relative to the prior response's URL.
    let target = match response.url.join(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            log::warn!("redirect target {url} has a non-http scheme, ending chain");
            return RedirectAction::Done;
        }
        Err(e) => {
            log::warn!("unresolvable Location {location:?} ({e}), ending chain");
            return RedirectAction::Done;
        }
    };

    let downgrade = DOWNGRADE_STATUSES.contains(&response.status)
        && prepared.method != Method::GET
        && prepared.method != Method::HEAD;

    let method = if downgrade {
        Method::GET
    } else {
        prepared.method.clone()
    };

    let strip_auth = target.host_str() != prepared.url.host_str();

    log::debug!(
        "following {} redirect to {} as {}{}",
        response.status,
        target,
        method,
        if strip_auth { " (auth stripped)" } else { "" }
    );

    RedirectAction::Follow(FollowUp {
        method,
        url: target,
        drop_body: downgrade,
        strip_auth,
    })
}
