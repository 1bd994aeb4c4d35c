//! Incremental decoder for `Transfer-Encoding: chunked` bodies.

use bytes::{Bytes, BytesMut};
use log::trace;

use crate::error::Error;

/// Decodes a chunked transfer coding fed to it in arbitrarily fragmented
/// pieces.
///
/// [`feed`][ChunkedDecoder::feed] returns the complete body exactly once,
/// when the zero-length chunk terminating the coding has been parsed;
/// every later call returns `None`. Trailers and chunk extensions are not
/// interpreted.
#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    body: BytesMut,
    /// Size-line bytes carried over when a line is split across packets.
    size_text: Vec<u8>,
    chunk_remaining: usize,
    /// Bytes of the next packet already consumed by a part that ran past
    /// the end of the previous one (a chunk terminator, typically).
    skip: usize,
    finished: bool,
    delivered: bool,
}

/// Outcome of parsing one part: how far the cursor moved, or the end of
/// the coding. The advance may run past the packet; the overshoot is
/// carried into the next packet as `skip`.
enum Part {
    Advance(usize),
    End,
}

impl ChunkedDecoder {
    pub(crate) fn new() -> ChunkedDecoder {
        ChunkedDecoder {
            body: BytesMut::new(),
            size_text: Vec::new(),
            chunk_remaining: 0,
            skip: 0,
            finished: false,
            delivered: false,
        }
    }

    /// The body decoded so far, for progress reporting.
    pub(crate) fn body_so_far(&self) -> &[u8] {
        &self.body
    }

    /// Feeds the next packet of body data.
    pub(crate) fn feed(&mut self, data: &[u8]) -> crate::Result<Option<Bytes>> {
        if self.delivered {
            return Ok(None);
        }
        if self.finished {
            self.delivered = true;
            return Ok(Some(self.take_body()));
        }

        let mut cursor = self.skip;
        loop {
            if cursor >= data.len() {
                self.skip = cursor - data.len();
                return Ok(None);
            }
            match self.parse_part(&data[cursor..])? {
                Part::Advance(len) => cursor += len,
                Part::End => {
                    trace!("end of chunked body, {} bytes", self.body.len());
                    self.finished = true;
                    self.delivered = true;
                    self.skip = 0;
                    return Ok(Some(self.take_body()));
                }
            }
        }
    }

    fn take_body(&mut self) -> Bytes {
        std::mem::take(&mut self.body).freeze()
    }

    /// A part is either a run of chunk payload or a size line.
    fn parse_part(&mut self, data: &[u8]) -> crate::Result<Part> {
        if self.chunk_remaining > 0 {
            Ok(self.parse_payload_part(data))
        } else {
            self.parse_size_part(data)
        }
    }

    fn parse_payload_part(&mut self, data: &[u8]) -> Part {
        if self.chunk_remaining > data.len() {
            self.chunk_remaining -= data.len();
            self.body.extend_from_slice(data);
            Part::Advance(data.len())
        } else {
            self.body.extend_from_slice(&data[..self.chunk_remaining]);
            // The CRLF terminating the payload is consumed here so the next
            // part starts at the size digits. It may run past this packet.
            let part_end = self.chunk_remaining + 2;
            self.chunk_remaining = 0;
            Part::Advance(part_end)
        }
    }

    fn parse_size_part(&mut self, data: &[u8]) -> crate::Result<Part> {
        let cr = match data.iter().position(|&b| b == b'\r') {
            Some(cr) => cr,
            None => {
                self.size_text.extend_from_slice(data);
                return Ok(Part::Advance(data.len()));
            }
        };

        let size = if self.size_text.is_empty() {
            parse_chunk_size(&data[..cr])?
        } else {
            self.size_text.extend_from_slice(&data[..cr]);
            let size = parse_chunk_size(&self.size_text)?;
            self.size_text.clear();
            size
        };
        trace!("chunk size={}", size);

        self.chunk_remaining = size;
        if size == 0 {
            Ok(Part::End)
        } else {
            Ok(Part::Advance(cr + 2))
        }
    }
}

/// Hexadecimal chunk size. Rejects empty text, non-hex bytes and sizes
/// that overflow `usize`.
fn parse_chunk_size(text: &[u8]) -> crate::Result<usize> {
    if text.is_empty() {
        return Err(Error::new_chunk_size());
    }
    let mut size: usize = 0;
    for &byte in text {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(Error::new_chunk_size()),
        };
        size = size
            .checked_mul(16)
            .and_then(|s| s.checked_add(usize::from(digit)))
            .ok_or_else(Error::new_chunk_size)?;
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(s: &str) -> usize {
        parse_chunk_size(s.as_bytes()).unwrap()
    }

    fn read_err(s: &str) {
        let err = parse_chunk_size(s.as_bytes()).unwrap_err();
        assert!(err.is_parse(), "expected parse error for {:?}", s);
    }

    #[test]
    fn chunk_size_grammar() {
        assert_eq!(1, read("1"));
        assert_eq!(1, read("01"));
        assert_eq!(0, read("0"));
        assert_eq!(0, read("00"));
        assert_eq!(10, read("A"));
        assert_eq!(10, read("a"));
        assert_eq!(255, read("Ff"));
        // Missing digits
        read_err("");
        // Invalid hex digit
        read_err("X");
        read_err("1X");
        read_err("-");
        read_err("-1");
        read_err("+1");
        read_err("1 ");
        // Overflow
        read_err("f0000000000000003");
    }

    #[test]
    fn single_chunk() {
        let mut decoder = ChunkedDecoder::new();
        let body = decoder.feed(b"5\r\nhello\r\n0\r\n\r\n").unwrap().unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[test]
    fn two_chunks() {
        let mut decoder = ChunkedDecoder::new();
        let body = decoder
            .feed(b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], b"hello world");
    }

    #[test]
    fn delivers_exactly_once() {
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.feed(b"1\r\nZ\r\n0\r\n\r\n").unwrap().is_some());
        assert!(decoder.feed(b"").unwrap().is_none());
        assert!(decoder.feed(b"5\r\nhello").unwrap().is_none());
    }

    #[test]
    fn byte_at_a_time() {
        let wire = b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let mut result = None;
        for (i, byte) in wire.iter().enumerate() {
            match decoder.feed(std::slice::from_ref(byte)).unwrap() {
                Some(body) => {
                    // completes on the CR that follows the zero size
                    assert_eq!(i, wire.len() - 4);
                    result = Some(body);
                    break;
                }
                None => continue,
            }
        }
        assert_eq!(&result.unwrap()[..], b"hello world");
    }

    #[test]
    fn every_split_point() {
        let wire = b"3\r\nfoo\r\nd\r\nbar baz quux \r\n0\r\n\r\n";
        for split in 0..wire.len() {
            let mut decoder = ChunkedDecoder::new();
            let first = decoder.feed(&wire[..split]).unwrap();
            let body = match first {
                Some(body) => body,
                None => decoder.feed(&wire[split..]).unwrap().expect("body"),
            };
            assert_eq!(&body[..], b"foobar baz quux ", "split at {}", split);
        }
    }

    #[test]
    fn size_line_split_across_packets() {
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.feed(b"F").unwrap().is_none());
        assert!(decoder.feed(b"f\r").unwrap().is_none());
        assert!(decoder.feed(b"\n").unwrap().is_none());
        let payload = vec![b'x'; 255];
        assert!(decoder.feed(&payload).unwrap().is_none());
        let body = decoder.feed(b"\r\n0\r\n\r\n").unwrap().unwrap();
        assert_eq!(body.len(), 255);
    }

    #[test]
    fn progress_is_observable() {
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.feed(b"5\r\nhel").unwrap().is_none());
        assert_eq!(decoder.body_so_far(), b"hel");
        assert!(decoder.feed(b"lo").unwrap().is_none());
        assert_eq!(decoder.body_so_far(), b"hello");
    }

    #[test]
    fn malformed_size_is_an_error() {
        let mut decoder = ChunkedDecoder::new();
        let err = decoder.feed(b"ZZ\r\nwhatever").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn malformed_size_after_valid_chunk() {
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.feed(b"1\r\nZ\r\n").unwrap().is_none());
        assert!(decoder.feed(b"Q\r\n").is_err());
    }
}
