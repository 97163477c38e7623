//! HTTP/1.1 implementation for rawhttp
//!
//! This module provides an HTTP/1.1 origin server and client that speak the
//! wire protocol directly over TCP sockets.
//!
//! # Architecture
//!
//! All socket I/O goes through the session operations abstraction:
//!
//! - `SessionOps` trait defines the transport operations (read, write, close)
//! - `HttpSession` wraps a transport and provides the framing primitives
//!   (`read_until_double_crlf`, `read_exactly`)
//! - `Framer` layers an early-body remainder over a session so the chunked
//!   decoder and the `Content-Length` reader never lose bytes read past the
//!   header boundary
//!
//! The server side is split into a pure decision layer (`parser`, `status`,
//! `response`) and the per-connection loop in `server`. The client side is
//! `client`, which is driven by the resource-fetch orchestrator in
//! [`crate::fetch`].
//!
//! # Examples
//!
//! ```no_run
//! use rawhttp::http::{HttpClient, Method};
//! use rawhttp::http::session::FdSessionOps;
//! use std::net::TcpStream;
//!
//! let stream = TcpStream::connect("127.0.0.1:5055").unwrap();
//! let mut client = HttpClient::new(FdSessionOps::new(stream), "localhost");
//!
//! let response = client.get("/index.html", false).unwrap();
//! assert_eq!(response.status().code(), 200);
//! ```

pub mod charset;
pub mod chunked;
pub mod client;
pub mod date;
pub mod freshness;
pub mod headers;
pub mod listener;
pub mod message;
pub mod parser;
pub mod response;
pub mod server;
pub mod session;
pub mod status;
pub mod store;

pub use charset::Charset;
pub use client::HttpClient;
pub use freshness::{FreshnessTable, StaticFreshnessTable};
pub use headers::Headers;
pub use listener::HttpListener;
pub use message::{HttpRequest, HttpResponse, Method, Status, Version};
pub use server::{HttpServer, ServerContext};
pub use session::{Framer, HttpSession, SessionOps};
pub use status::StatusEngine;
pub use store::{FsStore, ResourceStore, WriteMode};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Cannot resolve address: {0}")]
    Resolve(String),

    #[error("Resource store error: {0}")]
    Store(String),

    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Transport failures end the owning session; everything else is
    /// converted into a status response where it is detected.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::ConnectionClosed)
    }
}

/// Maximum number of headers per message
pub const MAX_HEADERS: usize = 64;

/// Port the server binds when none is configured
pub const DEFAULT_HTTP_PORT: u16 = 5055;

/// Read size used by the client while looking for the header boundary
pub const CLIENT_HEADER_READ_SIZE: usize = 4096;

/// Read size used by the server while looking for the header boundary.
///
/// One byte at a time, so the header read never consumes body bytes.
pub const SERVER_HEADER_READ_SIZE: usize = 1;

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// End of a header block
pub const DOUBLE_CRLF: &[u8] = b"\r\n\r\n";

/// Out-of-band teardown message the client writes before closing its socket.
///
/// It is not part of the HTTP grammar; the server gives it no special
/// treatment.
pub const DISCONNECT_SENTINEL: &[u8] = b"DISCONNECT";

/// The only protocol version the server accepts
pub const HTTP_VERSION: &str = "HTTP/1.1";
