//! Building and sending requests.

use std::fmt;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::debug;

use crate::error::Error;
use crate::header::Header;
use crate::method::Method;
use crate::net;
use crate::progress::{
    Callbacks, ResponseProgressBody, ResponseProgressHeaders, ResponseProgressRaw,
};
use crate::proto;
use crate::response::Response;
use crate::url::{split_url, uri_encode, Protocol, UrlComponents};

/// A single-use HTTP request.
///
/// Created by [`get`], [`post`], [`put`] or [`make_request`]; decorated
/// through the fluent, self-consuming mutators; finished with
/// [`send`][Request::send] or [`send_async`][Request::send_async].
pub struct Request {
    method: Method,
    url: String,
    components: UrlComponents,
    /// Accumulated header block. Starts with the CRLF that terminates the
    /// `Host` line, so composing the request is pure concatenation.
    headers: String,
    body: Vec<u8>,
    callbacks: Callbacks,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .finish()
    }
}

impl Request {
    fn new(method: Method, url: &str, default_protocol: Protocol) -> Request {
        let url = uri_encode(url);
        let mut components = split_url(&url);
        if components.protocol == Protocol::Unknown {
            components.protocol = default_protocol;
        }
        if components.port.is_none() {
            components.port = components.protocol.default_port();
        }
        Request {
            method,
            url,
            components,
            headers: String::from("\r\n"),
            body: Vec::new(),
            callbacks: Callbacks::default(),
        }
    }

    /// Appends headers to the request as raw text.
    ///
    /// The string may span multiple lines for multiple headers; a trailing
    /// CRLF is added when missing.
    pub fn add_headers(mut self, headers_string: &str) -> Request {
        if headers_string.is_empty() {
            return self;
        }
        self.headers.push_str(headers_string);
        if !headers_string.ends_with('\n') {
            self.headers.push_str("\r\n");
        }
        self
    }

    /// Appends a single header to the request.
    pub fn add_header(self, header: Header) -> Request {
        self.add_headers(&format!("{}: {}", header.name, header.value))
    }

    /// Appends every header in `headers` to the request.
    pub fn add_header_list<I>(mut self, headers: I) -> Request
    where
        I: IntoIterator<Item = Header>,
    {
        for header in headers {
            self = self.add_header(header);
        }
        self
    }

    /// Replaces the request body.
    pub fn set_body(mut self, body: impl Into<Vec<u8>>) -> Request {
        self.body = body.into();
        self
    }

    /// Installs a callback invoked for every packet read from the socket.
    pub fn set_raw_progress_callback<F>(mut self, callback: F) -> Request
    where
        F: FnMut(&mut ResponseProgressRaw<'_>) + Send + 'static,
    {
        self.callbacks.on_raw_progress = Some(Box::new(callback));
        self
    }

    /// Installs a callback invoked once the response headers are parsed.
    pub fn set_headers_callback<F>(mut self, callback: F) -> Request
    where
        F: FnMut(&mut ResponseProgressHeaders<'_>) + Send + 'static,
    {
        self.callbacks.on_headers = Some(Box::new(callback));
        self
    }

    /// Installs a callback invoked as the response body arrives.
    pub fn set_body_progress_callback<F>(mut self, callback: F) -> Request
    where
        F: FnMut(&mut ResponseProgressBody<'_>) + Send + 'static,
    {
        self.callbacks.on_body_progress = Some(Box::new(callback));
        self
    }

    /// Installs a callback invoked with the finished response, before
    /// `send` returns it. Not invoked when the exchange is stopped early.
    pub fn set_finish_callback<F>(mut self, callback: F) -> Request
    where
        F: FnMut(&mut Response) + Send + 'static,
    {
        self.callbacks.on_finish = Some(Box::new(callback));
        self
    }

    /// Sends the request and blocks until the response has been received.
    pub fn send(self) -> crate::Result<Response> {
        self.send_with_buffer_size(proto::DEFAULT_BUFFER_SIZE)
    }

    /// Sends the request, reading the response `buffer_size` bytes at a
    /// time.
    ///
    /// A small buffer delivers data in more, smaller progress events with
    /// some time cost; a large one reads fewer times at more memory cost.
    pub fn send_with_buffer_size(mut self, buffer_size: usize) -> crate::Result<Response> {
        let start = Instant::now();
        let stream = self.open_and_write()?;
        proto::receive_response(stream, self.url, self.callbacks, start, buffer_size)
    }

    /// Sends the request on a worker thread and returns immediately.
    pub fn send_async(self) -> ResponseFuture {
        self.send_async_with_buffer_size(proto::DEFAULT_BUFFER_SIZE)
    }

    /// Sends the request on a worker thread with an explicit read buffer
    /// size.
    pub fn send_async_with_buffer_size(self, buffer_size: usize) -> ResponseFuture {
        ResponseFuture {
            handle: thread::spawn(move || self.send_with_buffer_size(buffer_size)),
        }
    }

    fn open_and_write(&mut self) -> crate::Result<net::HttpStream> {
        let port = match self.components.port {
            Some(port) => port,
            None => {
                return Err(Error::new_connect(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no port could be resolved for the request url",
                )))
            }
        };

        let mut stream = net::connect(
            &self.components.host,
            port,
            self.components.protocol.is_tls(),
        )?;
        let request_data = self.serialize();
        stream.write_all(&request_data).map_err(Error::new_io)?;
        Ok(stream)
    }

    /// Serializes the request line, header block and body into wire bytes.
    fn serialize(&mut self) -> Vec<u8> {
        if !self.body.is_empty() {
            let mut length = itoa::Buffer::new();
            self.headers
                .push_str("Transfer-Encoding: identity\r\nContent-Length: ");
            self.headers.push_str(length.format(self.body.len()));
            self.headers.push_str("\r\n");
        }

        debug!(
            "request line: {} {} HTTP/1.1",
            self.method, self.components.path
        );

        let mut data = Vec::with_capacity(
            self.method.as_str().len()
                + self.components.path.len()
                + self.components.host.len()
                + self.headers.len()
                + self.body.len()
                + 32,
        );
        data.extend_from_slice(self.method.as_str().as_bytes());
        data.push(b' ');
        data.extend_from_slice(self.components.path.as_bytes());
        data.extend_from_slice(b" HTTP/1.1\r\nHost: ");
        data.extend_from_slice(self.components.host.as_bytes());
        data.extend_from_slice(self.headers.as_bytes());
        data.extend_from_slice(b"\r\n");
        data.extend_from_slice(&self.body);
        data
    }
}

/// A handle to a response being received on a worker thread.
#[derive(Debug)]
pub struct ResponseFuture {
    handle: JoinHandle<crate::Result<Response>>,
}

impl ResponseFuture {
    /// Blocks until the exchange completes and returns its outcome.
    ///
    /// A panic on the worker thread is resumed on the calling thread.
    pub fn wait(self) -> crate::Result<Response> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Whether the exchange has finished, without blocking.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Creates a GET request.
///
/// When `url` has no scheme prefix, plain HTTP is assumed.
pub fn get(url: &str) -> Request {
    Request::new(Method::Get, url, Protocol::Http)
}

/// Creates a POST request.
///
/// When `url` has no scheme prefix, plain HTTP is assumed.
pub fn post(url: &str) -> Request {
    Request::new(Method::Post, url, Protocol::Http)
}

/// Creates a PUT request.
///
/// When `url` has no scheme prefix, plain HTTP is assumed.
pub fn put(url: &str) -> Request {
    Request::new(Method::Put, url, Protocol::Http)
}

/// Creates a request with any method.
///
/// When `url` has no scheme prefix, `default_protocol` is used.
pub fn make_request(method: Method, url: &str, default_protocol: Protocol) -> Request {
    Request::new(method, url, default_protocol)
}
