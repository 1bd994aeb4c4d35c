//! TCP and TLS streams for HTTP exchanges.
//!
//! The rest of the library only needs `Read + Write` from a stream; this
//! module provides the one concrete implementation, [`HttpStream`], and
//! the [`connect`] function that opens it.

use std::convert::TryFrom;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use log::debug;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::error::Error;

/// A stream carrying one HTTP exchange.
pub enum HttpStream {
    /// A stream over plaintext TCP.
    Http(TcpStream),
    /// A stream protected by TLS.
    Https(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpStream::Http(..) => f.write_str("HttpStream::Http(..)"),
            HttpStream::Https(..) => f.write_str("HttpStream::Https(..)"),
        }
    }
}

impl Read for HttpStream {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            HttpStream::Http(ref mut inner) => inner.read(buf),
            HttpStream::Https(ref mut inner) => inner.read(buf),
        }
    }
}

impl Write for HttpStream {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            HttpStream::Http(ref mut inner) => inner.write(buf),
            HttpStream::Https(ref mut inner) => inner.write(buf),
        }
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match *self {
            HttpStream::Http(ref mut inner) => inner.flush(),
            HttpStream::Https(ref mut inner) => inner.flush(),
        }
    }
}

/// Opens a stream to `host:port`, negotiating TLS when `tls` is set.
///
/// The TLS handshake is driven to completion here so that certificate and
/// protocol failures surface as connection errors, not as read errors in
/// the middle of the exchange.
pub fn connect(host: &str, port: u16, tls: bool) -> crate::Result<HttpStream> {
    let tcp = TcpStream::connect((host, port)).map_err(Error::new_connect)?;

    if !tls {
        debug!("http scheme; connected to {}:{}", host, port);
        return Ok(HttpStream::Http(tcp));
    }

    debug!("https scheme; handshaking with {}:{}", host, port);
    let server_name =
        ServerName::try_from(host.to_owned()).map_err(Error::new_tls_connect)?;
    let connection = ClientConnection::new(tls_client_config(), server_name)
        .map_err(Error::new_tls_connect)?;
    let mut stream = StreamOwned::new(connection, tcp);
    while stream.conn.is_handshaking() {
        stream
            .conn
            .complete_io(&mut stream.sock)
            .map_err(Error::new_tls_connect)?;
    }
    Ok(HttpStream::Https(Box::new(stream)))
}

/// Platform-native root certificates, with the bundled Mozilla roots as a
/// fallback when none can be loaded.
fn tls_client_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = roots.add(cert);
        }
    }
    if roots.is_empty() {
        roots.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}
