//! Ephemeral static file server for the built gallery bundle.
//!
//! The thumbnail tool starts a [`PreviewServer`] on a random loopback port,
//! points a headless browser at the returned origin and closes the
//! [`ServerHandle`] once every capture has finished. Each connection runs as
//! its own task with a bounded lifetime and shares nothing but the read-only
//! [`SiteRoot`].

mod http;
mod mime;
mod server;
mod site;

pub use http::{Method, Request, Response};
pub use mime::{content_type_for, FALLBACK_MIME, MIME_TYPES};
pub use server::{respond, PreviewServer, ServerHandle, CONNECTION_DEADLINE};
pub use site::{normalize_relative, SiteRoot, INDEX_DOCUMENT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("request path is not valid UTF-8 after decoding: {0}")]
    BadPath(String),

    #[error("failed to build server origin: {0}")]
    Origin(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
