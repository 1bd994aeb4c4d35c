//! Incremental response parsing: status line, header block, body.

use bytes::{Bytes, BytesMut};
use log::trace;

use crate::error::Error;
use crate::header;
use crate::progress::{
    Callbacks, ResponseProgressBody, ResponseProgressHeaders, ResponseProgressRaw,
};
use crate::response::ParsedResponse;
use crate::status;

use super::decode::ChunkedDecoder;

/// End-of-header markers. `\n\n` line endings are not conformant with the
/// HTTP standard, but are accepted; the earliest match of either marker in
/// the buffer wins.
const HEADER_ENDINGS: [&[u8]; 2] = [b"\r\n\r\n", b"\n\n"];

enum BodyKind {
    Length(usize),
    Chunked(ChunkedDecoder),
}

/// Streaming parser for one HTTP response.
///
/// [`feed`][ResponseParser::feed] accepts packets with arbitrary boundaries
/// and reports progress through the installed callbacks. When the response
/// is complete (or a callback stopped the exchange), the parsed record is
/// returned exactly once; every later call returns `None`.
pub(crate) struct ResponseParser<'a> {
    buffer: BytesMut,
    result: ParsedResponse,
    done: bool,
    stopped: bool,
    body_start: usize,
    /// `None` until the header block has been parsed.
    body: Option<BodyKind>,
    callbacks: &'a mut Callbacks,
}

impl<'a> ResponseParser<'a> {
    pub(crate) fn new(callbacks: &'a mut Callbacks) -> ResponseParser<'a> {
        ResponseParser {
            buffer: BytesMut::new(),
            result: ParsedResponse::default(),
            done: false,
            stopped: false,
            body_start: 0,
            body: None,
            callbacks,
        }
    }

    /// Whether the exchange was ended early by a callback.
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Parses a new packet of response data.
    ///
    /// Returns the parsed response when the end of the response is reached.
    pub(crate) fn feed(&mut self, data: &[u8]) -> crate::Result<Option<ParsedResponse>> {
        if self.done {
            return Ok(None);
        }

        let new_data_start = self.buffer.len();
        self.buffer.extend_from_slice(data);

        let mut stopped = false;
        if let Some(ref mut on_raw) = self.callbacks.on_raw_progress {
            let mut event = ResponseProgressRaw::new(&self.buffer, new_data_start);
            on_raw(&mut event);
            stopped = event.is_stopped();
        }
        if stopped {
            self.finish_stopped();
        }

        if !self.done && self.body.is_none() {
            self.try_parse_headers(new_data_start)?;
        }

        if !self.done && self.body.is_some() {
            self.parse_new_body_data(new_data_start)?;
        }

        if self.done {
            return Ok(Some(std::mem::take(&mut self.result)));
        }
        Ok(None)
    }

    fn finish_stopped(&mut self) {
        self.stopped = true;
        self.done = true;
    }

    fn try_parse_headers(&mut self, new_data_start: usize) -> crate::Result<()> {
        let (header_end, marker_len) = match find_header_ending(&self.buffer, new_data_start) {
            Some(found) => found,
            None => return Ok(()),
        };
        self.body_start = header_end + marker_len;
        self.result.headers_string =
            String::from_utf8_lossy(&self.buffer[..header_end]).into_owned();

        let status_line_end = self
            .result
            .headers_string
            .find(|c| c == '\r' || c == '\n')
            .unwrap_or(self.result.headers_string.len());
        self.result.status_line =
            status::parse_status_line(&self.result.headers_string[..status_line_end]);
        if self.result.headers_string.len() > status_line_end {
            self.result.headers =
                header::parse_header_block(&self.result.headers_string[status_line_end..]);
        }
        trace!(
            "parsed headers; status={} fields={}",
            self.result.status_line.status_code,
            self.result.headers.len()
        );

        let mut stopped = false;
        if let Some(ref mut on_headers) = self.callbacks.on_headers {
            let raw = ResponseProgressRaw::new(&self.buffer, new_data_start);
            let mut event = ResponseProgressHeaders::new(raw, &self.result);
            on_headers(&mut event);
            stopped = event.raw.is_stopped();
        }
        if stopped {
            self.finish_stopped();
            return Ok(());
        }

        self.body = Some(self.body_kind()?);
        Ok(())
    }

    /// Body framing: `Content-Length` when present (an unparseable value is
    /// a parse failure), else chunked when declared, else an empty body.
    fn body_kind(&self) -> crate::Result<BodyKind> {
        if let Some(content_length) = header::find_header(&self.result.headers, "content-length") {
            return Ok(BodyKind::Length(parse_content_length(&content_length.value)?));
        }
        match header::find_header(&self.result.headers, "transfer-encoding") {
            Some(encoding) if encoding.value == "chunked" => {
                Ok(BodyKind::Chunked(ChunkedDecoder::new()))
            }
            _ => Ok(BodyKind::Length(0)),
        }
    }

    fn parse_new_body_data(&mut self, new_data_start: usize) -> crate::Result<()> {
        let body_start = self.body_start;
        match self.body {
            Some(BodyKind::Chunked(ref mut decoder)) => {
                // The packet that finished the headers may also carry the
                // first body bytes; start there in that case.
                let parse_from = new_data_start.max(body_start);
                match decoder.feed(&self.buffer[parse_from..])? {
                    Some(body) => {
                        self.result.body_data = body;
                        emit_body_progress(
                            self.callbacks,
                            &self.buffer,
                            new_data_start,
                            &self.result,
                            &self.result.body_data,
                            None,
                        );
                        self.done = true;
                    }
                    None => {
                        let stopped = emit_body_progress(
                            self.callbacks,
                            &self.buffer,
                            new_data_start,
                            &self.result,
                            decoder.body_so_far(),
                            None,
                        );
                        if stopped {
                            self.finish_stopped();
                        }
                    }
                }
            }
            Some(BodyKind::Length(size)) => {
                if self.buffer.len() >= body_start + size {
                    self.result.body_data =
                        Bytes::copy_from_slice(&self.buffer[body_start..body_start + size]);
                    emit_body_progress(
                        self.callbacks,
                        &self.buffer,
                        new_data_start,
                        &self.result,
                        &self.result.body_data,
                        Some(size),
                    );
                    self.done = true;
                } else {
                    let stopped = emit_body_progress(
                        self.callbacks,
                        &self.buffer,
                        new_data_start,
                        &self.result,
                        &self.buffer[body_start..],
                        Some(size),
                    );
                    if stopped {
                        self.finish_stopped();
                    }
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn emit_body_progress(
    callbacks: &mut Callbacks,
    buffer: &[u8],
    new_data_start: usize,
    parsed: &ParsedResponse,
    body_so_far: &[u8],
    total_expected_size: Option<usize>,
) -> bool {
    if let Some(ref mut on_body) = callbacks.on_body_progress {
        let raw = ResponseProgressRaw::new(buffer, new_data_start);
        let mut event =
            ResponseProgressBody::new(raw, parsed, body_so_far, total_expected_size);
        on_body(&mut event);
        return event.raw.is_stopped();
    }
    false
}

/// Searches for the earliest end-of-headers marker. The search starts just
/// far enough before the new packet to catch a marker straddling the
/// packet boundary. Returns the marker position and its length.
fn find_header_ending(buffer: &[u8], new_data_start: usize) -> Option<(usize, usize)> {
    let mut found: Option<(usize, usize)> = None;
    for &marker in HEADER_ENDINGS.iter() {
        let search_from = new_data_start.saturating_sub(marker.len() - 1);
        if let Some(position) = find_subslice(buffer, marker, search_from) {
            match found {
                Some((best, _)) if best <= position => {}
                _ => found = Some((position, marker.len())),
            }
        }
    }
    found
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Base-10 `Content-Length`; digits only, no sign, overflow rejected.
fn parse_content_length(value: &str) -> crate::Result<usize> {
    if value.is_empty() {
        return Err(Error::new_content_length());
    }
    let mut size: usize = 0;
    for &byte in value.as_bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            _ => return Err(Error::new_content_length()),
        };
        size = size
            .checked_mul(10)
            .and_then(|s| s.checked_add(usize::from(digit)))
            .ok_or_else(Error::new_content_length)?;
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ParsedHeaders;

    const SIMPLE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

    fn parse_all(wire: &[u8]) -> ParsedResponse {
        let mut callbacks = Callbacks::default();
        let mut parser = ResponseParser::new(&mut callbacks);
        parser.feed(wire).unwrap().expect("response not complete")
    }

    #[test]
    fn by_length_response() {
        let parsed = parse_all(SIMPLE);
        assert_eq!(parsed.status_line.status_code, 200);
        assert_eq!(parsed.status_line.status_message, "OK");
        assert_eq!(parsed.status_line.http_version, "HTTP/1.1");
        assert_eq!(parsed.get_header_value("content-length"), Some("5"));
        assert_eq!(&parsed.body_data[..], b"hello");
    }

    #[test]
    fn one_byte_at_a_time_matches_single_feed() {
        let expected = parse_all(SIMPLE);

        let mut callbacks = Callbacks::default();
        let mut parser = ResponseParser::new(&mut callbacks);
        let mut result = None;
        for byte in SIMPLE {
            if let Some(parsed) = parser.feed(std::slice::from_ref(byte)).unwrap() {
                result = Some(parsed);
            }
        }
        let result = result.expect("response not complete");
        assert_eq!(result.status_line, expected.status_line);
        assert_eq!(result.headers_string, expected.headers_string);
        assert_eq!(result.headers, expected.headers);
        assert_eq!(result.body_data, expected.body_data);
    }

    #[test]
    fn every_split_point_matches_single_feed() {
        let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let expected = parse_all(wire);
        for split in 0..wire.len() {
            let mut callbacks = Callbacks::default();
            let mut parser = ResponseParser::new(&mut callbacks);
            let first = parser.feed(&wire[..split]).unwrap();
            let parsed = match first {
                Some(parsed) => parsed,
                None => parser
                    .feed(&wire[split..])
                    .unwrap()
                    .expect("response not complete"),
            };
            assert_eq!(parsed.body_data, expected.body_data, "split at {}", split);
            assert_eq!(parsed.headers, expected.headers, "split at {}", split);
        }
    }

    #[test]
    fn chunked_equals_by_length() {
        let by_length = parse_all(SIMPLE);
        let chunked = parse_all(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
        );
        assert_eq!(by_length.body_data, chunked.body_data);
    }

    #[test]
    fn lenient_line_endings() {
        let parsed = parse_all(b"HTTP/1.1 200 OK\nContent-Length: 2\n\nok");
        assert_eq!(parsed.status_line.status_code, 200);
        assert_eq!(parsed.get_header_value("Content-Length"), Some("2"));
        assert_eq!(&parsed.body_data[..], b"ok");
    }

    #[test]
    fn no_framing_headers_means_empty_body() {
        let parsed = parse_all(b"HTTP/1.1 204 No Content\r\nServer: x\r\n\r\n");
        assert_eq!(parsed.status_line.status_code, 204);
        assert!(parsed.body_data.is_empty());
    }

    #[test]
    fn headers_string_excludes_terminator() {
        let parsed = parse_all(SIMPLE);
        assert_eq!(
            parsed.headers_string,
            "HTTP/1.1 200 OK\r\nContent-Length: 5"
        );
    }

    #[test]
    fn marker_straddles_packet_boundary() {
        let mut callbacks = Callbacks::default();
        let mut parser = ResponseParser::new(&mut callbacks);
        assert!(parser.feed(b"HTTP/1.1 200 OK\r\n\r").unwrap().is_none());
        let parsed = parser.feed(b"\n").unwrap().expect("response not complete");
        assert_eq!(parsed.status_line.status_code, 200);
        assert!(parsed.body_data.is_empty());
    }

    #[test]
    fn earliest_marker_wins() {
        // the bare-LF blank line comes first; the conformant CRLF pair
        // inside the body must not be preferred over it
        let parsed = parse_all(b"HTTP/1.1 200 OK\nContent-Length: 5\n\nA\r\n\r\n");
        assert_eq!(parsed.headers_string, "HTTP/1.1 200 OK\nContent-Length: 5");
        assert_eq!(&parsed.body_data[..], b"A\r\n\r\n");
    }

    #[test]
    fn malformed_content_length_is_an_error() {
        let mut callbacks = Callbacks::default();
        let mut parser = ResponseParser::new(&mut callbacks);
        let err = parser
            .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 5x\r\n\r\n")
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn malformed_chunk_size_is_an_error() {
        let mut callbacks = Callbacks::default();
        let mut parser = ResponseParser::new(&mut callbacks);
        let err = parser
            .feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nZZ\r\n")
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn content_length_grammar() {
        assert_eq!(parse_content_length("0").unwrap(), 0);
        assert_eq!(parse_content_length("5").unwrap(), 5);
        assert_eq!(parse_content_length("4096").unwrap(), 4096);
        assert!(parse_content_length("").is_err());
        assert!(parse_content_length("+5").is_err());
        assert!(parse_content_length("-5").is_err());
        assert!(parse_content_length("5 ").is_err());
        assert!(parse_content_length("99999999999999999999999999").is_err());
    }

    #[test]
    fn stop_from_raw_event_returns_partial() {
        let mut callbacks = Callbacks::default();
        callbacks.on_raw_progress = Some(Box::new(|raw| raw.stop()));
        let mut parser = ResponseParser::new(&mut callbacks);
        let parsed = parser.feed(b"HTTP/1.1 2").unwrap().expect("stopped response");
        // stopped before the headers ever parsed
        assert_eq!(parsed.status_line.status_code, 0);
        assert!(parser.is_stopped());
        // a stopped parser yields nothing further
        assert!(parser.feed(b"00 OK\r\n\r\n").unwrap().is_none());
    }

    #[test]
    fn stop_from_headers_event_keeps_headers() {
        let mut callbacks = Callbacks::default();
        callbacks.on_headers = Some(Box::new(|headers| headers.stop()));
        let mut parser = ResponseParser::new(&mut callbacks);
        let parsed = parser.feed(SIMPLE).unwrap().expect("stopped response");
        assert_eq!(parsed.status_line.status_code, 200);
        assert_eq!(parsed.get_header_value("content-length"), Some("5"));
        assert!(parsed.body_data.is_empty());
        assert!(parser.is_stopped());
    }

    #[test]
    fn body_progress_carries_expected_size() {
        use std::sync::{Arc, Mutex};

        let sizes = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sizes);
        let mut callbacks = Callbacks::default();
        callbacks.on_body_progress = Some(Box::new(move |body| {
            recorded.lock().unwrap().push(body.total_expected_size);
        }));
        let mut parser = ResponseParser::new(&mut callbacks);
        parser
            .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nab")
            .unwrap();
        parser.feed(b"cd").unwrap();
        assert_eq!(*sizes.lock().unwrap(), vec![Some(4), Some(4)]);
    }
}
