//! Session-based HTTP client core.
//!
//! `courier` turns a declarative [`Request`] into a wire-ready
//! [`PreparedRequest`], hands it to a pluggable [`Transport`], and resolves
//! the result into a final [`Response`]: redirects followed hop by hop,
//! cookies persisted in a shared jar, text encoding detected lazily, and
//! user hooks observing every pipeline stage.
//!
//! ```no_run
//! use courier::{Request, Session};
//!
//! # async fn run() -> courier::Result<()> {
//! let session = Session::new()?;
//! let response = session.get("http://example.com").await?;
//! println!("{} {}", response.status, response.text());
//!
//! let response = session
//!     .send(Request::post("http://example.com/login")
//!         .form(vec![("user".to_string(), "me".into())])
//!         .allow_redirects(true))
//!     .await?;
//! println!("landed on {} after {} hops", response.url, response.history.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod cookies;
pub mod encoding;
pub mod errors;
pub mod hooks;
pub mod params;
pub mod redirect;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use auth::Auth;
pub use config::SessionConfig;
pub use cookies::{Cookie, CookieJar, CookieJarHandle};
pub use errors::{Error, Result};
pub use hooks::{HookEvent, Hooks};
pub use params::{Body, FieldValue, Fields, FilePart};
pub use request::{PreparedRequest, Request};
pub use response::Response;
pub use session::Session;
pub use transport::{RawResponse, ReqwestTransport, Transport};
