//! Error and Result module.

use std::error::Error as StdError;
use std::fmt;

/// Result type often returned from methods that can have tether `Error`s.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur during an HTTP exchange.
///
/// Only two classes of failure escape the library: connection failures
/// ([`is_connect`][Error::is_connect]) and response parse failures
/// ([`is_parse`][Error::is_parse]).
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Error occurred while opening the connection.
    Connect { is_tls: bool },
    /// An `io::Error` occurred while reading or writing the stream.
    Io,
    /// The peer closed the connection before the response completed.
    IncompleteMessage,
    /// The response could not be parsed.
    Parse(Parse),
}

#[derive(Debug)]
pub(crate) enum Parse {
    ChunkSize,
    ContentLength,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    pub(crate) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    pub(crate) fn new_connect<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::Connect { is_tls: false }).with(cause)
    }

    pub(crate) fn new_tls_connect<E: Into<Cause>>(cause: E) -> Error {
        Error::new(Kind::Connect { is_tls: true }).with(cause)
    }

    pub(crate) fn new_io(cause: std::io::Error) -> Error {
        Error::new(Kind::Io).with(cause)
    }

    pub(crate) fn new_incomplete() -> Error {
        Error::new(Kind::IncompleteMessage)
    }

    pub(crate) fn new_chunk_size() -> Error {
        Error::new(Kind::Parse(Parse::ChunkSize))
    }

    pub(crate) fn new_content_length() -> Error {
        Error::new(Kind::Parse(Parse::ContentLength))
    }

    /// Returns true if the connection failed: the socket could not be
    /// opened, the TLS handshake failed, reading or writing failed, or the
    /// peer closed the connection before the response completed.
    pub fn is_connect(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::Connect { .. } | Kind::Io | Kind::IncompleteMessage
        )
    }

    /// Returns true if the response could not be parsed.
    pub fn is_parse(&self) -> bool {
        matches!(self.inner.kind, Kind::Parse(_))
    }

    /// Returns true if this connection failure originated in the TLS layer.
    pub fn is_tls_failure(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect { is_tls: true })
    }

    /// Returns true if the peer closed the connection mid-response.
    pub fn is_incomplete_message(&self) -> bool {
        matches!(self.inner.kind, Kind::IncompleteMessage)
    }

    /// Consumes the error, returning its cause.
    pub fn into_cause(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.inner.cause
    }

    fn description(&self) -> &str {
        match self.inner.kind {
            Kind::Connect { is_tls: false } => "error trying to connect",
            Kind::Connect { is_tls: true } => "error completing the TLS handshake",
            Kind::Io => "connection error",
            Kind::IncompleteMessage => "connection closed before message completed",
            Kind::Parse(Parse::ChunkSize) => "invalid chunk size line",
            Kind::Parse(Parse::ContentLength) => "invalid content-length parsed",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_tuple("tether::Error");
        f.field(&self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            f.field(cause);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref cause) = self.inner.cause {
            write!(f, "{}: {}", self.description(), cause)
        } else {
            f.write_str(self.description())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

#[doc(hidden)]
trait AssertSendSync: Send + Sync + 'static {}
#[doc(hidden)]
impl AssertSendSync for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn error_size_of() {
        assert_eq!(mem::size_of::<Error>(), mem::size_of::<usize>());
    }

    #[test]
    fn classification() {
        assert!(Error::new_incomplete().is_connect());
        assert!(!Error::new_incomplete().is_parse());
        assert!(Error::new_chunk_size().is_parse());
        assert!(!Error::new_chunk_size().is_connect());
        assert!(Error::new_tls_connect(std::io::Error::new(
            std::io::ErrorKind::Other,
            "handshake"
        ))
        .is_tls_failure());
        assert!(!Error::new_connect(std::io::Error::new(
            std::io::ErrorKind::Other,
            "refused"
        ))
        .is_tls_failure());
    }

    #[test]
    fn display_includes_cause() {
        let err = Error::new_io(std::io::Error::new(std::io::ErrorKind::Other, "oh no"));
        assert_eq!(err.to_string(), "connection error: oh no");
    }
}
