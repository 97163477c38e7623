//! Session operations abstraction and byte-stream framing
//!
//! This module provides the session operations pattern that keeps every
//! piece of HTTP I/O independent of the underlying transport, plus the two
//! framing primitives the rest of the crate is built on:
//!
//! - [`HttpSession::read_until_double_crlf`] accumulates bounded reads until
//!   the header boundary and hands back the bytes read past it
//! - [`HttpSession::read_exactly`] reads exactly `n` bytes, never asking the
//!   transport for more than the remaining deficit
//!
//! Bytes that have been consumed from the transport are never pushed back;
//! the only carry-over is the explicit early-body remainder, which
//! [`Framer`] drains before touching the transport again.

use super::{Error, Result, DOUBLE_CRLF};
use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Upper bound on a header block before the peer is considered broken
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Upper bound on a single chunk-size line
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Session operations trait
///
/// This trait defines the operations that can be performed on a transport.
/// A read returning `Ok(0)` means the peer closed its side.
pub trait SessionOps {
    /// Read data from the session
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write data to the session
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Close the session
    fn close(&mut self) -> Result<()>;
}

/// HTTP session wrapping a transport with session operations
pub struct HttpSession<S: SessionOps> {
    session: S,
}

impl<S: SessionOps> HttpSession<S> {
    /// Create a new HTTP session
    pub fn new(session: S) -> Self {
        HttpSession { session }
    }

    /// Read data from the transport
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.session.read(buf)
    }

    /// Write data to the transport
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.session.write(buf)
    }

    /// Write the whole buffer, looping over short writes
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0;

        while written < buf.len() {
            let n = self.session.write(&buf[written..])?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            written += n;
        }

        Ok(())
    }

    /// Read until the `\r\n\r\n` header terminator has been seen.
    ///
    /// Each transport read asks for at most `read_size` bytes. Returns the
    /// header bytes (terminator excluded) and whatever was read past the
    /// terminator.
    pub fn read_until_double_crlf(&mut self, read_size: usize) -> Result<(Bytes, BytesMut)> {
        self.read_head(BytesMut::with_capacity(read_size.max(256)), read_size)
    }

    /// Like [`read_until_double_crlf`](Self::read_until_double_crlf), but
    /// starts from bytes left over by the previous message.
    pub fn read_head(&mut self, mut buf: BytesMut, read_size: usize) -> Result<(Bytes, BytesMut)> {
        if let Some(pos) = find_double_crlf(&buf) {
            let head = buf.split_to(pos).freeze();
            buf.advance(DOUBLE_CRLF.len());
            return Ok((head, buf));
        }

        let mut temp = vec![0u8; read_size.max(1)];

        loop {
            let n = self.session.read(&mut temp)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }

            // The terminator may straddle two reads.
            let search_from = buf.len().saturating_sub(DOUBLE_CRLF.len() - 1);
            buf.extend_from_slice(&temp[..n]);

            if let Some(pos) = find_double_crlf(&buf[search_from..]) {
                let head = buf.split_to(search_from + pos).freeze();
                buf.advance(DOUBLE_CRLF.len());
                return Ok((head, buf));
            }

            if buf.len() > MAX_HEADER_BYTES {
                return Err(Error::BadRequest(format!(
                    "header block exceeds {} bytes",
                    MAX_HEADER_BYTES
                )));
            }
        }
    }

    /// Read exactly `n` bytes, asking for at most `min(read_size, deficit)`
    /// bytes per transport read.
    pub fn read_exactly(&mut self, n: usize, read_size: usize) -> Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        // n comes from the peer; grow with the data instead of up front.
        let mut temp = vec![0u8; read_size.clamp(1, n)];
        let mut out = Vec::with_capacity(temp.len());

        while out.len() < n {
            let want = (n - out.len()).min(temp.len());
            let got = self.session.read(&mut temp[..want])?;
            if got == 0 {
                return Err(Error::ConnectionClosed);
            }
            out.extend_from_slice(&temp[..got]);
        }

        Ok(out)
    }

    /// Read and drop exactly `n` bytes, holding at most `read_size` of them
    /// at a time
    pub fn discard(&mut self, n: usize, read_size: usize) -> Result<()> {
        let mut left = n;
        let mut temp = vec![0u8; read_size.clamp(1, n.max(1))];

        while left > 0 {
            let want = left.min(temp.len());
            let got = self.session.read(&mut temp[..want])?;
            if got == 0 {
                return Err(Error::ConnectionClosed);
            }
            left -= got;
        }

        Ok(())
    }

    /// Close the session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    /// Get a reference to the underlying session
    pub fn get_ref(&self) -> &S {
        &self.session
    }

    /// Get a mutable reference to the underlying session
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

/// Body-phase reader that drains an early-body remainder before reading
/// from the transport.
pub struct Framer<'a, S: SessionOps> {
    session: &'a mut HttpSession<S>,
    carry: BytesMut,
    read_size: usize,
}

impl<'a, S: SessionOps> Framer<'a, S> {
    /// Create a framer over `session`, starting with the bytes already read
    /// past the header boundary
    pub fn new(session: &'a mut HttpSession<S>, carry: BytesMut, read_size: usize) -> Self {
        Framer {
            session,
            carry,
            read_size: read_size.max(1),
        }
    }

    /// Read exactly `n` bytes
    pub fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        let take = n.min(self.carry.len());
        let mut out = self.carry.split_to(take).to_vec();

        if out.len() < n {
            let rest = self.session.read_exactly(n - out.len(), self.read_size)?;
            out.extend_from_slice(&rest);
        }

        Ok(out)
    }

    /// Discard exactly `n` bytes
    pub fn skip(&mut self, n: usize) -> Result<()> {
        let take = n.min(self.carry.len());
        self.carry.advance(take);

        if take < n {
            self.session.discard(n - take, self.read_size)?;
        }

        Ok(())
    }

    /// Read one CRLF-terminated line, terminator excluded.
    ///
    /// Once the remainder is exhausted the transport is read one byte at a
    /// time so nothing past the line is consumed.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut scanned = 0;

        loop {
            if let Some(pos) = find_crlf(&self.carry[scanned..]) {
                let line = self.carry.split_to(scanned + pos).to_vec();
                self.carry.advance(2);
                return Ok(line);
            }

            if self.carry.len() > MAX_LINE_BYTES {
                return Err(Error::Parse(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_BYTES
                )));
            }

            scanned = self.carry.len().saturating_sub(1);
            let byte = self.session.read_exactly(1, 1)?;
            self.carry.extend_from_slice(&byte);
        }
    }

    /// Give back whatever is left of the remainder
    pub fn into_remainder(self) -> BytesMut {
        self.carry
    }
}

/// Find CRLF in buffer
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Find the header terminator in buffer
pub(crate) fn find_double_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(DOUBLE_CRLF.len()).position(|w| w == DOUBLE_CRLF)
}

/// Plain TCP session operations
pub struct FdSessionOps {
    stream: TcpStream,
}

impl FdSessionOps {
    /// Create a new session operations object from a TCP stream
    pub fn new(stream: TcpStream) -> Self {
        FdSessionOps { stream }
    }

    /// Address of the remote end, if still known
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

}

impl SessionOps for FdSessionOps {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(Error::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf).map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        self.stream.shutdown(Shutdown::Both).map_err(Error::from)
    }
}

/// In-memory transport with scripted read boundaries.
///
/// Every read returns bytes from at most one scripted segment, so a test can
/// reproduce any split of the same logical byte stream. Writes are captured.
#[derive(Debug, Default)]
pub struct MemorySessionOps {
    segments: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
}

impl MemorySessionOps {
    /// Deliver `data` in segments of at most `segment_size` bytes
    pub fn new(data: &[u8], segment_size: usize) -> Self {
        Self::from_segments(data.chunks(segment_size.max(1)).map(<[u8]>::to_vec))
    }

    /// Deliver the given segments in order
    pub fn from_segments<I: IntoIterator<Item = Vec<u8>>>(segments: I) -> Self {
        MemorySessionOps {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
            written: Vec::new(),
            closed: false,
        }
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Bytes that have not been read yet
    pub fn unread(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl SessionOps for MemorySessionOps {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(mut segment) = self.segments.pop_front() else {
            return Ok(0);
        };

        let n = buf.len().min(segment.len());
        buf[..n].copy_from_slice(&segment[..n]);

        if n < segment.len() {
            segment.drain(..n);
            self.segments.push_front(segment);
        }

        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Helper to create an HTTP session from a TCP stream
pub fn from_tcp_stream(stream: TcpStream) -> HttpSession<FdSessionOps> {
    HttpSession::new(FdSessionOps::new(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn memory(data: &[u8], segment: usize) -> HttpSession<MemorySessionOps> {
        HttpSession::new(MemorySessionOps::new(data, segment))
    }

    #[test]
    fn test_fd_session_ops() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"Hello").unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut session = from_tcp_stream(stream);

        let data = session.read_exactly(5, 4096).unwrap();
        assert_eq!(data, b"Hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_header_boundary_with_single_byte_reads() {
        let mut session = memory(b"GET / HTTP/1.1\r\nHost: a\r\n\r\nBODY", 64);
        let (head, rest) = session.read_until_double_crlf(1).unwrap();

        assert_eq!(&head[..], b"GET / HTTP/1.1\r\nHost: a");
        assert!(rest.is_empty());
        assert_eq!(session.get_ref().unread(), 4);
    }

    #[test]
    fn test_header_boundary_returns_early_body() {
        let mut session = memory(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nBODY", 4096);
        let (head, rest) = session.read_until_double_crlf(4096).unwrap();

        assert_eq!(&head[..], b"HTTP/1.1 200 OK\r\nContent-Length: 4");
        assert_eq!(&rest[..], b"BODY");
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let session = MemorySessionOps::from_segments(vec![
            b"GET / HTTP/1.1\r\n\r".to_vec(),
            b"\nX".to_vec(),
        ]);
        let mut session = HttpSession::new(session);
        let (head, rest) = session.read_until_double_crlf(4096).unwrap();

        assert_eq!(&head[..], b"GET / HTTP/1.1");
        assert_eq!(&rest[..], b"X");
    }

    #[test]
    fn test_header_read_hits_eof() {
        let mut session = memory(b"GET / HTTP/1.1\r\n", 4);
        let result = session.read_until_double_crlf(4096);
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_read_exactly_never_over_reads() {
        let mut session = memory(b"0123456789", 10);
        let data = session.read_exactly(4, 4096).unwrap();

        assert_eq!(data, b"0123");
        assert_eq!(session.get_ref().unread(), 6);
    }

    #[test]
    fn test_read_exactly_short_stream() {
        let mut session = memory(b"abc", 1);
        assert!(matches!(
            session.read_exactly(5, 4096),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_read_exactly_huge_length_short_stream() {
        let mut session = memory(b"abc", 4096);
        assert!(matches!(
            session.read_exactly(100_000_000_000_000, 4096),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_read_head_uses_leftover_bytes() {
        let mut session = memory(b"", 1);
        let leftover = BytesMut::from(&b"GET /b HTTP/1.1\r\n\r\nGET /c"[..]);
        let (head, rest) = session.read_head(leftover, 4096).unwrap();

        assert_eq!(&head[..], b"GET /b HTTP/1.1");
        assert_eq!(&rest[..], b"GET /c");
    }

    #[test]
    fn test_framer_skip_spans_remainder_and_transport() {
        let mut session = memory(b"defgh", 2);
        let mut framer = Framer::new(&mut session, BytesMut::from(&b"abc"[..]), 4096);

        framer.skip(4).unwrap();
        assert_eq!(framer.read_exactly(1).unwrap(), b"e");
        assert!(matches!(
            framer.skip(100_000_000_000_000),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_framer_drains_remainder_first() {
        let mut session = memory(b"defgh", 2);
        let mut framer = Framer::new(&mut session, BytesMut::from(&b"abc"[..]), 4096);

        assert_eq!(framer.read_exactly(2).unwrap(), b"ab");
        assert_eq!(framer.read_exactly(3).unwrap(), b"cde");
        assert!(framer.into_remainder().is_empty());
        assert_eq!(session.get_ref().unread(), 3);
    }

    #[test]
    fn test_framer_read_line_spans_remainder_and_transport() {
        let mut session = memory(b"f\r\nrest", 16);
        let mut framer = Framer::new(&mut session, BytesMut::from(&b"1"[..]), 4096);

        assert_eq!(framer.read_line().unwrap(), b"1f");
        assert_eq!(session.get_ref().unread(), 4);
    }

    #[test]
    fn test_write_all_captures_bytes() {
        let mut session = memory(b"", 1);
        session.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();
        assert_eq!(
            session.get_ref().written(),
            b"HTTP/1.1 204 No Content\r\n\r\n"
        );
    }
}
