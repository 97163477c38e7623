//! HTTP client implementation
//!
//! One [`HttpClient`] drives one connection: it writes requests and frames
//! the responses with `Content-Length` or chunked decoding. The body charset
//! is a field of the client and follows the `charset=` parameter of the most
//! recent response that named a recognized one.

use super::chunked::ChunkedDecoder;
use super::parser::{self, ResponseHead};
use super::session::FdSessionOps;
use super::{
    Charset, Error, Framer, Headers, HttpRequest, HttpResponse, HttpSession, Method, Result,
    SessionOps, CLIENT_HEADER_READ_SIZE, DISCONNECT_SENTINEL,
};
use bytes::BytesMut;
use std::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

/// Bytes requested per read while reading a response body
const BODY_READ_SIZE: usize = 4096;

/// HTTP client
///
/// Provides methods for sending requests and receiving responses.
pub struct HttpClient<S: SessionOps> {
    session: HttpSession<S>,
    host: String,
    charset: Charset,
    header_read_size: usize,
    pending: BytesMut,
}

/// Resolve `host` and open a plain TCP client to it
pub fn connect(host: &str, port: u16) -> Result<HttpClient<FdSessionOps>> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Resolve(format!("{}: {}", host, e)))?
        .collect();

    if addrs.is_empty() {
        return Err(Error::Resolve(format!("{}: no addresses", host)));
    }

    let stream = TcpStream::connect(&addrs[..])?;
    info!(host, port, peer = ?stream.peer_addr().ok(), "connected");

    Ok(HttpClient::new(FdSessionOps::new(stream), host))
}

impl<S: SessionOps> HttpClient<S> {
    /// Create a client for `host` over an open session
    pub fn new(session: S, host: impl Into<String>) -> Self {
        HttpClient {
            session: HttpSession::new(session),
            host: host.into(),
            charset: Charset::default(),
            header_read_size: CLIENT_HEADER_READ_SIZE,
            pending: BytesMut::new(),
        }
    }

    /// Bytes requested per read while looking for the end of a header block
    pub fn with_header_read_size(mut self, size: usize) -> Self {
        self.header_read_size = size.max(1);
        self
    }

    /// Host sent in the `Host` header
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Charset currently used for response bodies
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Decode a body with the current charset
    pub fn decode_body(&self, body: &[u8]) -> String {
        self.charset.decode(body)
    }

    /// Build a request for `path`.
    ///
    /// PUT and POST always carry `Connection: close`, `Content-Type:
    /// text/html` and a `Content-Length`. Other methods only ask for close
    /// when `close` is set.
    pub fn build_request(&self, method: Method, path: &str, body: &[u8], close: bool) -> HttpRequest {
        let builder = HttpRequest::builder()
            .method(method)
            .target(path)
            .header("Host", self.host.as_str());

        if method.is_write() {
            builder
                .header("Connection", "close")
                .header("Content-Type", "text/html")
                .header("Content-Length", body.len().to_string())
                .body(body.to_vec())
                .build()
        } else if close {
            builder.header("Connection", "close").build()
        } else {
            builder.build()
        }
    }

    /// Send an HTTP request
    pub fn send_request(&mut self, request: &HttpRequest) -> Result<()> {
        debug!(
            host = %self.host,
            method = %request.method(),
            target = request.target(),
            "sending request"
        );
        self.session.write_all(&request.to_wire())
    }

    /// Receive the response to a `method` request.
    ///
    /// HEAD responses are read up to the end of the header block only.
    /// Otherwise `Content-Length` takes precedence over chunked encoding; a
    /// response with neither has an empty body. Bytes read past the response
    /// are kept for the next one.
    pub fn receive_response(&mut self, method: Method) -> Result<HttpResponse> {
        let pending = std::mem::take(&mut self.pending);
        let (raw, early) = self.session.read_head(pending, self.header_read_size)?;
        let head = parser::parse_response_head(&Charset::Latin1.decode(&raw))?;

        if let Some(content_type) = head.headers.get_ignore_case("Content-Type") {
            self.charset.update_from_content_type(content_type);
        }

        let body = if method == Method::Head {
            self.pending = early;
            Vec::new()
        } else {
            let mut framer = Framer::new(&mut self.session, early, BODY_READ_SIZE);
            let body = read_body(&mut framer, &head.headers)?;
            self.pending = framer.into_remainder();
            body
        };

        debug!(
            host = %self.host,
            status = head.status.code(),
            length = body.len(),
            "response received"
        );

        Ok(into_response(head, body))
    }

    /// Send one request and wait for its response
    pub fn request(
        &mut self,
        method: Method,
        path: &str,
        body: &[u8],
        close: bool,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, path, body, close);
        self.send_request(&request)?;
        self.receive_response(method)
    }

    /// GET `path`, asking the server to close afterwards when `close` is set
    pub fn get(&mut self, path: &str, close: bool) -> Result<HttpResponse> {
        self.request(Method::Get, path, &[], close)
    }

    /// Write the disconnect sentinel and close the connection.
    ///
    /// Failures are ignored; the peer may already be gone.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.session.write_all(DISCONNECT_SENTINEL) {
            debug!(host = %self.host, error = %e, "sentinel not delivered");
        }
        if let Err(e) = self.session.close() {
            debug!(host = %self.host, error = %e, "close failed");
        }
    }

    /// Get a reference to the underlying session
    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }
}

fn read_body<S: SessionOps>(framer: &mut Framer<'_, S>, headers: &Headers) -> Result<Vec<u8>> {
    if let Some(length) = headers.get_ignore_case("Content-Length") {
        let length = length
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::Parse(format!("Invalid Content-Length: {}", length)))?;
        return framer.read_exactly(length);
    }

    let chunked = headers
        .get_ignore_case("Transfer-Encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return ChunkedDecoder::new().decode(framer);
    }

    Ok(Vec::new())
}

fn into_response(head: ResponseHead, body: Vec<u8>) -> HttpResponse {
    HttpResponse::builder()
        .version(head.version)
        .status(head.status)
        .reason(head.reason)
        .headers(head.headers)
        .body(body)
        .build()
}
