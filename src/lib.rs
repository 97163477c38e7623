//! rawhttp - HTTP/1.1 client and server over plain TCP sockets
//!
//! This crate implements the HTTP/1.1 wire protocol by hand: message framing,
//! `Content-Length` and chunked bodies, request validation, status decisions
//! (including conditional GET) and a client that mirrors a document together
//! with the resources it embeds.

pub mod config;
pub mod fetch;
pub mod http;
