//! The blocking receive loop.
//!
//! One stream, one parser: read, feed, repeat until the parser reports the
//! response complete (or stopped), then wrap the result into a
//! [`Response`].

use std::io::Read;
use std::time::Instant;

use log::{debug, trace};

use crate::error::Error;
use crate::progress::Callbacks;
use crate::response::Response;

use super::parse::ResponseParser;

/// Default read buffer size in bytes.
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Drives `stream` until the response parser completes, then builds the
/// final [`Response`].
///
/// `start` is the instant captured just before the socket was opened, so
/// the reported total time covers the whole exchange. A read of zero bytes
/// while the parser is still incomplete means the peer closed early.
pub(crate) fn receive_response<R: Read>(
    mut stream: R,
    url: String,
    mut callbacks: Callbacks,
    start: Instant,
    buffer_size: usize,
) -> crate::Result<Response> {
    let mut parser = ResponseParser::new(&mut callbacks);
    let mut buffer = vec![0u8; buffer_size];

    let (parsed, stopped) = loop {
        let read = match stream.read(&mut buffer) {
            Ok(read) => read,
            Err(cause) => return Err(Error::new_io(cause)),
        };
        if read == 0 {
            debug!("connection closed with the response incomplete");
            return Err(Error::new_incomplete());
        }
        trace!("read {} bytes", read);

        if let Some(parsed) = parser.feed(&buffer[..read])? {
            break (parsed, parser.is_stopped());
        }
    };

    let total_time = start.elapsed();
    let mut response = Response::new(parsed, url, total_time);
    if !stopped {
        if let Some(ref mut on_finish) = callbacks.on_finish {
            on_finish(&mut response);
        }
    }
    Ok(response)
}
