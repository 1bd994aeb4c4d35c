//! URL splitting and URI encoding.
//!
//! [`split_url`] breaks a URL string into protocol, host, port and path
//! without decoding anything; [`uri_encode`] percent-encodes the bytes that
//! may not appear in a request target.

/// The transfer protocols understood by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Plaintext HTTP, default port 80.
    Http,
    /// TLS-encrypted HTTP, default port 443.
    Https,
    /// The URL carried no recognized scheme.
    Unknown,
}

impl Protocol {
    /// The default port for this protocol, if it has one.
    pub fn default_port(&self) -> Option<u16> {
        match *self {
            Protocol::Http => Some(80),
            Protocol::Https => Some(443),
            Protocol::Unknown => None,
        }
    }

    /// Whether this protocol runs over TLS.
    pub fn is_tls(&self) -> bool {
        matches!(*self, Protocol::Https)
    }

    /// Matches a scheme string, ASCII case-insensitively.
    pub fn from_scheme(scheme: &str) -> Protocol {
        if scheme.eq_ignore_ascii_case("http") {
            Protocol::Http
        } else if scheme.eq_ignore_ascii_case("https") {
            Protocol::Https
        } else {
            Protocol::Unknown
        }
    }
}

/// The result of [`split_url`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlComponents {
    /// Protocol named by the scheme prefix, `Unknown` when absent.
    pub protocol: Protocol,
    /// Host part of the authority.
    pub host: String,
    /// Explicit `host:port` port, else the protocol default, else `None`.
    pub port: Option<u16>,
    /// Absolute path, `/` when the URL has none.
    pub path: String,
}

impl Default for UrlComponents {
    fn default() -> UrlComponents {
        UrlComponents {
            protocol: Protocol::Unknown,
            host: String::new(),
            port: None,
            path: String::from("/"),
        }
    }
}

/// Splits a URL into its components.
///
/// The string is trimmed of ASCII whitespace first. A `scheme://` prefix
/// selects the protocol and its default port; an explicit `host:port`
/// overrides the port. Nothing is percent-decoded; the path is kept
/// verbatim and defaults to `/`.
pub fn split_url(url: &str) -> UrlComponents {
    let url = url.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
    if url.is_empty() {
        return UrlComponents::default();
    }

    let mut components = UrlComponents::default();

    let rest = match url.find("://") {
        Some(scheme_end) => {
            components.protocol = Protocol::from_scheme(&url[..scheme_end]);
            components.port = components.protocol.default_port();
            &url[scheme_end + 3..]
        }
        None => url,
    };

    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, "/"),
    };

    let (host, port) = split_authority(authority);
    components.host = host.to_owned();
    if port.is_some() {
        components.port = port;
    }
    components.path = path.to_owned();
    components
}

/// Splits an authority into host and optional port.
///
/// `"localhost:8080"` yields `("localhost", Some(8080))`; when the suffix
/// after the last `:` is not a port number, the whole string is the host.
pub fn split_authority(authority: &str) -> (&str, Option<u16>) {
    if let Some(colon) = authority.rfind(':') {
        if let Ok(port) = authority[colon + 1..].parse::<u16>() {
            return (&authority[..colon], Some(port));
        }
    }
    (authority, None)
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn is_allowed_uri_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"%-._~:/?#[]@!$&'()*+,;=".contains(&byte)
}

/// Returns the URI-encoded equivalent of `uri`.
///
/// Every byte outside the allowed set becomes `%` followed by two uppercase
/// hex digits. The pass is not repeated, and existing escapes are not
/// decoded.
pub fn uri_encode(uri: &str) -> String {
    let mut encoded = String::with_capacity(uri.len());
    for &byte in uri.as_bytes() {
        if is_allowed_uri_byte(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push('%');
            encoded.push(HEX_DIGITS[(byte >> 4) as usize] as char);
            encoded.push(HEX_DIGITS[(byte & 0xf) as usize] as char);
        }
    }
    encoded
}
