//! The response status line.

/// The first line of an HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusLine {
    /// Version token, e.g. `HTTP/1.1`.
    pub http_version: String,
    /// Numeric status code; `0` when the line could not be parsed.
    pub status_code: u16,
    /// Reason phrase, kept as the server sent it.
    pub status_message: String,
}

/// Parses a status line such as `HTTP/1.1 200 OK`.
///
/// Parsing is best-effort: whatever fields can be extracted are filled in
/// and the rest keep their defaults.
pub fn parse_status_line(line: &str) -> StatusLine {
    let mut status_line = StatusLine::default();

    let version_end = match line.find(' ') {
        Some(end) => end,
        None => return status_line,
    };
    status_line.http_version = line[..version_end].to_owned();

    let rest = &line[version_end + 1..];
    let code_end = match rest.find(' ') {
        Some(end) => end,
        None => return status_line,
    };
    status_line.status_code = match rest[..code_end].parse() {
        Ok(code) => code,
        Err(_) => return status_line,
    };

    let message = &rest[code_end + 1..];
    let message_end = message
        .as_bytes()
        .iter()
        .rposition(|&b| !matches!(b, b'\r' | b'\n' | b' '))
        .map(|i| i + 1)
        .unwrap_or(0);
    status_line.status_message = message[..message_end].to_owned();
    status_line
}
