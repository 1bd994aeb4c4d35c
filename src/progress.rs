//! Progress events delivered while a response is received.
//!
//! All callbacks run synchronously on the thread driving the receive loop,
//! in a fixed order: zero or more raw events, at most one headers event,
//! zero or more body events, then the finish callback. When the caller
//! stops the exchange early, the finish callback is skipped.
//!
//! The views carried by an event (the raw buffer, the body so far, the
//! parsed response) are only valid for the duration of the callback.

use crate::response::{ParsedHeaders, ParsedResponse, Response};

/// Raw progress: fires for every packet read from the socket, before any
/// parsing of that packet happens.
#[derive(Debug)]
pub struct ResponseProgressRaw<'a> {
    /// Everything received so far, including the newest packet.
    pub data: &'a [u8],
    /// Offset into `data` where the newest packet begins.
    pub new_data_start: usize,
    stopped: bool,
}

impl<'a> ResponseProgressRaw<'a> {
    pub(crate) fn new(data: &'a [u8], new_data_start: usize) -> ResponseProgressRaw<'a> {
        ResponseProgressRaw {
            data,
            new_data_start,
            stopped: false,
        }
    }

    /// Asks the receive loop to end the exchange at the next boundary.
    ///
    /// The response returned from `send` then contains whatever had been
    /// parsed up to this point. Stopping more than once is harmless.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Fires exactly once, when the header block has been fully parsed.
#[derive(Debug)]
pub struct ResponseProgressHeaders<'a> {
    /// Raw progress for the packet that completed the headers.
    pub raw: ResponseProgressRaw<'a>,
    parsed: &'a ParsedResponse,
}

impl<'a> ResponseProgressHeaders<'a> {
    pub(crate) fn new(
        raw: ResponseProgressRaw<'a>,
        parsed: &'a ParsedResponse,
    ) -> ResponseProgressHeaders<'a> {
        ResponseProgressHeaders { raw, parsed }
    }

    /// Asks the receive loop to end the exchange at the next boundary.
    pub fn stop(&mut self) {
        self.raw.stop();
    }
}

impl ParsedHeaders for ResponseProgressHeaders<'_> {
    fn parsed_response(&self) -> &ParsedResponse {
        self.parsed
    }
}

/// Fires for every packet while the body is received, and once more when
/// the body completes.
#[derive(Debug)]
pub struct ResponseProgressBody<'a> {
    /// Raw progress for the packet that carried this body data.
    pub raw: ResponseProgressRaw<'a>,
    /// The body decoded so far.
    pub body_so_far: &'a [u8],
    /// Expected total body size. `None` under chunked transfer encoding,
    /// where the total is unknown until the terminating chunk.
    pub total_expected_size: Option<usize>,
    parsed: &'a ParsedResponse,
}

impl<'a> ResponseProgressBody<'a> {
    pub(crate) fn new(
        raw: ResponseProgressRaw<'a>,
        parsed: &'a ParsedResponse,
        body_so_far: &'a [u8],
        total_expected_size: Option<usize>,
    ) -> ResponseProgressBody<'a> {
        ResponseProgressBody {
            raw,
            body_so_far,
            total_expected_size,
            parsed,
        }
    }

    /// Asks the receive loop to end the exchange at the next boundary.
    pub fn stop(&mut self) {
        self.raw.stop();
    }
}

impl ParsedHeaders for ResponseProgressBody<'_> {
    fn parsed_response(&self) -> &ParsedResponse {
        self.parsed
    }
}

pub(crate) type RawProgressCallback = Box<dyn FnMut(&mut ResponseProgressRaw<'_>) + Send>;
pub(crate) type HeadersCallback = Box<dyn FnMut(&mut ResponseProgressHeaders<'_>) + Send>;
pub(crate) type BodyProgressCallback = Box<dyn FnMut(&mut ResponseProgressBody<'_>) + Send>;
pub(crate) type FinishCallback = Box<dyn FnMut(&mut Response) + Send>;

/// The caller-installed callback set for one exchange.
#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) on_raw_progress: Option<RawProgressCallback>,
    pub(crate) on_headers: Option<HeadersCallback>,
    pub(crate) on_body_progress: Option<BodyProgressCallback>,
    pub(crate) on_finish: Option<FinishCallback>,
}
