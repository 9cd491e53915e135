//! Chunked transfer-encoding decoder.
//!
//! ```text
//! chunk      = size-line CRLF data CRLF
//! size-line  = hex-digits [";" chunk-extensions]
//! last-chunk = "0" CRLF [trailers] CRLF
//! ```
//! Chunk extensions and trailers are discarded.

use super::HttpParseError;

/// Decodes a complete chunked body out of `buf`, starting at offset 0.
/// Returns the decoded payload and the number of input bytes consumed
/// (through the terminating `CRLF` after the trailers), or `None` if `buf`
/// does not yet contain the terminating zero-length chunk.
pub fn decode(buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, HttpParseError> {
    let mut pos = 0;
    let mut out = Vec::new();
    loop {
        let line_end = match find_crlf(&buf[pos..]) {
            Some(i) => pos + i,
            None => return Ok(None),
        };
        let size_line = &buf[pos..line_end];
        let size_str = std::str::from_utf8(size_line)
            .map_err(|_| HttpParseError::MalformedChunk)?
            .split(';')
            .next()
            .unwrap()
            .trim();
        let size = usize::from_str_radix(size_str, 16).map_err(|_| HttpParseError::MalformedChunk)?;
        let data_start = line_end + 2;
        if size == 0 {
            // last-chunk: optional trailers followed by a final CRLF.
            let mut trailer_pos = data_start;
            loop {
                let trailer_line_end = match find_crlf(&buf[trailer_pos..]) {
                    Some(i) => trailer_pos + i,
                    None => return Ok(None),
                };
                if trailer_line_end == trailer_pos {
                    return Ok(Some((out, trailer_line_end + 2)));
                }
                trailer_pos = trailer_line_end + 2;
            }
        }
        let data_end = data_start + size;
        if buf.len() < data_end + 2 {
            return Ok(None);
        }
        out.extend_from_slice(&buf[data_start..data_end]);
        pos = data_end + 2;
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
