//! The transport collaborator boundary.
//!
//! This crate does not implement sockets or TLS. It hands a frozen
//! [`PreparedRequest`] to a [`Transport`] and gets back a buffered
//! [`RawResponse`] (or a `Connection`/`Timeout` error). Everything above —
//! preparation, redirects, cookies, hooks — is this crate's pipeline;
//! everything below is the transport's problem.
//!
//! [`ReqwestTransport`] is the bundled implementation. It disables reqwest's
//! own redirect following and cookie store, since both are implemented by
//! the pipeline on top of it. Content decompression stays with reqwest:
//! gzip/brotli/deflate bodies are negotiated and decoded below this
//! boundary, so `RawResponse::body` is always the decoded payload.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use http::HeaderMap;

use crate::errors::{Error, Result};
use crate::request::PreparedRequest;

/// Transport output: one buffered hop, undecorated.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// A pluggable request sender.
///
/// Implementations must be injectable as `Arc<dyn Transport>`, hence the
/// boxed future return. `timeout` covers the whole round trip; expiry maps
/// to [`Error::Timeout`]. `proxies` maps a URL scheme to a proxy URL.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a PreparedRequest,
        timeout: Option<Duration>,
        proxies: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<RawResponse>>;
}

/// Transport backed by a [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(ReqwestTransport { client })
    }

    /// Returns the shared client, or a dedicated one when per-request
    /// proxies are in play (reqwest configures proxies per client).
    fn client_for(&self, proxies: &HashMap<String, String>) -> Result<reqwest::Client> {
        if proxies.is_empty() {
            return Ok(self.client.clone());
        }
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        for (scheme, proxy_url) in proxies {
            let proxy = match scheme.as_str() {
                "http" => reqwest::Proxy::http(proxy_url),
                "https" => reqwest::Proxy::https(proxy_url),
                _ => reqwest::Proxy::all(proxy_url),
            }
            .map_err(|e| Error::Connection(format!("invalid proxy {proxy_url}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Connection(e.to_string())
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: &'a PreparedRequest,
        timeout: Option<Duration>,
        proxies: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<RawResponse>> {
        Box::pin(async move {
            let client = self.client_for(proxies)?;

            let mut builder = client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone());
            if !request.body.is_empty() {
                builder = builder.body(request.body.clone());
            }
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(map_reqwest_error)?
                .to_vec();

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        })
    }
}
