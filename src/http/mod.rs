//! Manual HTTP/1.1 message parsing: enough to route, filter, and forward
//! requests and responses without a full HTTP library.

pub mod chunked;
mod parser;

pub use parser::{
    read_request, read_response, Destination, ParsedRequest, ParsedResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum HttpParseError {
    #[error("connection closed before headers completed")]
    HeaderIncomplete,
    #[error("connection closed before body completed")]
    BodyIncomplete,
    #[error("malformed chunked-encoding chunk")]
    MalformedChunk,
    #[error("malformed request or status line")]
    BadStatusLine,
    #[error("request has no usable destination")]
    NoDestination,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn header_value<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Deletes the first header line matching `name` (case-insensitive), along
/// with its trailing CRLF. Operates on the raw header+body bytes of a
/// message, leaving the rest of the message untouched.
pub fn remove_header(message: &[u8], name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len());
    let mut pos = 0;
    let mut removed = false;
    while pos < message.len() {
        let line_end = message[pos..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|i| pos + i + 2)
            .unwrap_or(message.len());
        let line = &message[pos..line_end];
        let is_target = !removed
            && line
                .iter()
                .position(|&b| b == b':')
                .map(|colon| {
                    std::str::from_utf8(&line[..colon])
                        .map(|k| k.trim().eq_ignore_ascii_case(name))
                        .unwrap_or(false)
                })
                .unwrap_or(false);
        if is_target {
            removed = true;
        } else {
            out.extend_from_slice(line);
        }
        if line == b"\r\n" {
            // end of header block; copy the remainder (body) verbatim.
            out.extend_from_slice(&message[line_end..]);
            return out;
        }
        pos = line_end;
    }
    out
}

/// Inserts a header line just before the header block's terminating blank
/// line. Assumes `message` contains a well-formed `\r\n\r\n` header
/// terminator.
pub fn insert_header(message: &[u8], name: &str, value: &str) -> Vec<u8> {
    let terminator = b"\r\n\r\n";
    match message.windows(4).position(|w| w == terminator) {
        Some(pos) => {
            let mut out = Vec::with_capacity(message.len() + name.len() + value.len() + 4);
            out.extend_from_slice(&message[..pos + 2]);
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&message[pos + 2..]);
            out
        }
        None => message.to_vec(),
    }
}
