//! HTTP server connection handling
//!
//! One [`HttpServer`] owns one accepted connection for its whole life and
//! drives it through
//! `AwaitingRequest -> Parsing -> Dispatching -> Responding`, then back to
//! `AwaitingRequest` or to `Closed`.
//!
//! - invalid requests get a 400 and the session carries on
//! - dispatch failures get a 500 and the session carries on
//! - `Connection: close` closes the session after the response
//! - transport failures close the session without a response

use super::charset::Charset;
use super::parser::{self, RequestHead};
use super::response::ResponseBuilder;
use super::{
    Error, Framer, FreshnessTable, HttpRequest, HttpResponse, HttpSession, ResourceStore, Result,
    SessionOps, Status, StatusEngine, SERVER_HEADER_READ_SIZE,
};
use bytes::BytesMut;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bytes requested per read while reading a request body
const BODY_READ_SIZE: usize = 4096;

/// Read-only state shared by every connection of a listener
pub struct ServerContext {
    store: Arc<dyn ResourceStore>,
    engine: StatusEngine,
    responses: ResponseBuilder,
    header_read_size: usize,
}

impl ServerContext {
    /// Create a context serving `store`, answering conditional GETs from
    /// `freshness` and advertising `origin` in `Location` headers
    pub fn new(
        store: Arc<dyn ResourceStore>,
        freshness: Arc<dyn FreshnessTable>,
        origin: impl Into<String>,
    ) -> Self {
        ServerContext {
            store,
            engine: StatusEngine::new(freshness),
            responses: ResponseBuilder::new(origin),
            header_read_size: SERVER_HEADER_READ_SIZE,
        }
    }

    /// Bytes requested per read while looking for the end of a header block
    pub fn with_header_read_size(mut self, size: usize) -> Self {
        self.header_read_size = size.max(1);
        self
    }

    /// The `http://host:port` prefix used in `Location` headers
    pub fn origin(&self) -> &str {
        self.responses.origin()
    }

    /// Decide, perform the write if any, and build the response
    pub fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let store = self.store.as_ref();
        let status = self.engine.decide(request, store)?;
        self.responses.apply_write(request, status, store)?;
        self.responses.build(request, status, store)
    }

    /// [`dispatch`](Self::dispatch), with any failure turned into a 500
    pub fn respond(&self, request: &HttpRequest) -> HttpResponse {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    method = %request.method(),
                    target = request.target(),
                    error = %e,
                    "dispatch failed"
                );
                self.responses.failure(request, Status::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Response for a request that failed validation
    pub fn bad_request(&self) -> HttpResponse {
        self.responses.status_only(Status::BAD_REQUEST)
    }
}

/// What arrived on the connection
#[derive(Debug)]
pub enum Incoming {
    /// A validated request with its body
    Request(HttpRequest),
    /// A header block that failed validation
    Rejected(Error),
}

/// One received message plus the close decision for it
#[derive(Debug)]
pub struct Received {
    pub incoming: Incoming,
    pub close: bool,
}

/// Where a session stands after an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingRequest,
    Closed,
}

/// HTTP server side of one connection
pub struct HttpServer<S: SessionOps> {
    session: HttpSession<S>,
    context: Arc<ServerContext>,
    peer: String,
    // Bytes read past the previous request.
    pending: BytesMut,
}

impl<S: SessionOps> HttpServer<S> {
    /// Create a new HTTP server with a session
    pub fn new(session: S, context: Arc<ServerContext>) -> Self {
        HttpServer {
            session: HttpSession::new(session),
            context,
            peer: "unknown".to_string(),
            pending: BytesMut::new(),
        }
    }

    /// Label the peer in log records
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Receive one request.
    ///
    /// The header block is read with the context's header read size, then
    /// exactly `Content-Length` body bytes. Rejected requests still have
    /// their announced body drained. Bytes read past the request are kept
    /// for the next one.
    pub fn receive_request(&mut self) -> Result<Received> {
        let pending = std::mem::take(&mut self.pending);
        let (head, early) = match self
            .session
            .read_head(pending, self.context.header_read_size)
        {
            Ok(parts) => parts,
            Err(e) if !e.is_transport() => {
                return Ok(Received {
                    incoming: Incoming::Rejected(e),
                    close: true,
                })
            }
            Err(e) => return Err(e),
        };

        let text = Charset::Latin1.decode(&head);
        let close = parser::wants_close(&text);
        debug!(peer = %self.peer, head = %text, "request head received");

        let mut framer = Framer::new(&mut self.session, early, BODY_READ_SIZE);

        let received = match parser::parse_request_head(&text) {
            Ok(head) => Self::read_body(&mut framer, head, close)?,
            Err(e) => {
                if let Some(length) = parser::declared_length(&text) {
                    framer.skip(length)?;
                }
                Received {
                    incoming: Incoming::Rejected(e),
                    close,
                }
            }
        };

        self.pending = framer.into_remainder();
        Ok(received)
    }

    fn read_body(framer: &mut Framer<'_, S>, head: RequestHead, close: bool) -> Result<Received> {
        let length = match head.content_length() {
            Ok(length) => length.unwrap_or(0),
            // Without a usable length the stream cannot be framed any more.
            Err(e) => {
                return Ok(Received {
                    incoming: Incoming::Rejected(e),
                    close: true,
                })
            }
        };

        let body = framer.read_exactly(length)?;
        Ok(Received {
            incoming: Incoming::Request(head.into_request(body)),
            close,
        })
    }

    /// Send an HTTP response
    pub fn send_response(&mut self, response: &HttpResponse) -> Result<()> {
        self.session.write_all(&response.to_wire())
    }

    /// Handle one request/response exchange
    pub fn serve_one(&mut self) -> Result<SessionState> {
        let received = self.receive_request()?;

        let response = match &received.incoming {
            Incoming::Request(request) => {
                let response = self.context.respond(request);
                info!(
                    peer = %self.peer,
                    method = %request.method(),
                    target = request.target(),
                    status = response.status().code(),
                    "request served"
                );
                response
            }
            Incoming::Rejected(e) => {
                info!(peer = %self.peer, reason = %e, status = 400, "request rejected");
                self.context.bad_request()
            }
        };

        self.send_response(&response)?;

        if received.close {
            Ok(SessionState::Closed)
        } else {
            Ok(SessionState::AwaitingRequest)
        }
    }

    /// Serve requests until the session closes
    pub fn run(mut self) {
        loop {
            match self.serve_one() {
                Ok(SessionState::AwaitingRequest) => continue,
                Ok(SessionState::Closed) => {
                    debug!(peer = %self.peer, "closing on request");
                    break;
                }
                Err(Error::ConnectionClosed) => {
                    debug!(peer = %self.peer, "peer disconnected");
                    break;
                }
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "connection failed");
                    break;
                }
            }
        }

        if let Err(e) = self.session.close() {
            debug!(peer = %self.peer, error = %e, "close failed");
        }
    }

    /// Get a reference to the underlying session
    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }
}
