//! Chunked transfer encoding support
//!
//! This module provides encoding and decoding for HTTP chunked transfer
//! encoding. The server never emits chunked bodies; the decoder exists for
//! responses from third-party origins, the encoder for test peers.

use super::session::{Framer, HttpSession, MemorySessionOps, SessionOps};
use super::{Error, Result, CRLF};
use bytes::BytesMut;
use std::io::Write;

/// Largest slice of a chunk requested from the framer at once
const CHUNK_READ_SIZE: usize = 4096;

/// Chunked encoder
///
/// Encodes data in HTTP chunked transfer encoding format
pub struct ChunkedEncoder<W: Write> {
    writer: W,
}

impl<W: Write> ChunkedEncoder<W> {
    /// Create a new chunked encoder
    pub fn new(writer: W) -> Self {
        ChunkedEncoder { writer }
    }

    /// Write a chunk of data
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        // A zero-sized chunk would terminate the body.
        if data.is_empty() {
            return Ok(());
        }

        write!(self.writer, "{:x}{}", data.len(), CRLF)?;
        self.writer.write_all(data)?;
        self.writer.write_all(CRLF.as_bytes())?;

        Ok(())
    }

    /// Write the final chunk (0-sized chunk)
    pub fn finish(&mut self) -> Result<()> {
        write!(self.writer, "0{}{}", CRLF, CRLF)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Chunked decoder
///
/// Pulls size lines and chunk data through a [`Framer`], so it can start
/// from the early-body remainder of a header read. Decoding is iterative and
/// places no limit on the number of chunks.
#[derive(Debug, Default)]
pub struct ChunkedDecoder {
    remaining: usize,
    body: Vec<u8>,
}

impl ChunkedDecoder {
    /// Create a new chunked decoder
    pub fn new() -> Self {
        ChunkedDecoder {
            remaining: 0,
            body: Vec::new(),
        }
    }

    /// Decode a complete chunked body.
    ///
    /// Terminates on the first chunk of declared size 0. The two bytes after
    /// each chunk's data are skipped without being checked.
    pub fn decode<S: SessionOps>(mut self, framer: &mut Framer<'_, S>) -> Result<Vec<u8>> {
        loop {
            let line = framer.read_line()?;
            let size = parse_chunk_size(&line)?;

            if size == 0 {
                Self::skip_trailers(framer)?;
                return Ok(self.body);
            }

            self.remaining = size;
            while self.remaining > 0 {
                let data = framer.read_exactly(self.remaining.min(CHUNK_READ_SIZE))?;
                self.remaining -= data.len();
                self.body.extend_from_slice(&data);
            }

            framer.skip(2)?;
        }
    }

    /// Consume optional trailer lines and the final empty line.
    ///
    /// A peer that closes right after the zero-sized chunk still yields a
    /// complete body.
    fn skip_trailers<S: SessionOps>(framer: &mut Framer<'_, S>) -> Result<()> {
        loop {
            match framer.read_line() {
                Ok(line) if line.is_empty() => return Ok(()),
                Ok(_) => continue,
                Err(Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse a chunk-size line, ignoring chunk extensions
pub fn parse_chunk_size(line: &[u8]) -> Result<usize> {
    let line = String::from_utf8_lossy(line);
    let size_str = line.split(';').next().unwrap_or_default().trim();

    usize::from_str_radix(size_str, 16)
        .map_err(|_| Error::InvalidChunkSize(size_str.to_string()))
}

/// Decode complete chunked body from bytes
pub fn decode_chunked_body(input: &[u8]) -> Result<Vec<u8>> {
    let mut session = HttpSession::new(MemorySessionOps::new(input, CHUNK_READ_SIZE));
    let mut framer = Framer::new(&mut session, BytesMut::new(), CHUNK_READ_SIZE);
    ChunkedDecoder::new().decode(&mut framer)
}

/// Encode data as chunked body
pub fn encode_chunked_body(data: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut encoder = ChunkedEncoder::new(&mut output);

    for chunk in data.chunks(chunk_size.max(1)) {
        encoder.write_chunk(chunk)?;
    }

    encoder.finish()?;

    Ok(output)
}
