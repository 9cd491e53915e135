use super::{chunked, header_value, HttpParseError};
use std::io::Read;
use std::net::TcpStream;

/// Where a request should be routed: either `CONNECT`'s tunnel target, or the
/// host/port a plain request should be forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Connect { host: String, port: u16 },
    Forward { host: String, port: u16 },
}

impl Destination {
    pub fn host_port(&self) -> (&str, u16) {
        match self {
            Destination::Connect { host, port } => (host, *port),
            Destination::Forward { host, port } => (host, *port),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub raw: Vec<u8>,
    pub method: String,
    pub destination: Destination,
    pub keep_alive: bool,
}

#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub raw: Vec<u8>,
    pub status_code: u16,
    pub decoded_body: Vec<u8>,
    pub keep_alive: bool,
}

enum BodyMode {
    Empty,
    Fixed(usize),
    Chunked,
    UntilClose,
}

/// Reads one complete request off `stream`. Returns `Ok(None)` if the peer
/// closed the connection before sending any bytes at all (a clean end of a
/// keep-alive loop, not an error).
pub fn read_request(stream: &mut TcpStream) -> Result<Option<ParsedRequest>, HttpParseError> {
    let Some(mut buf) = read_until_header_end(stream)? else {
        return Ok(None);
    };
    let header_end = find_header_end(&buf).expect("read_until_header_end guarantees this");
    let head_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head_text.lines();
    let request_line = lines.next().ok_or(HttpParseError::BadStatusLine)?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or(HttpParseError::BadStatusLine)?
        .to_string();
    let target = parts
        .next()
        .ok_or(HttpParseError::BadStatusLine)?
        .to_string();
    let version = parts.next().unwrap_or("HTTP/1.1").to_string();

    let mode = body_mode(&head_text, true, None);
    fill_body(stream, &mut buf, header_end, &mode)?;

    let decoded_body = extract_body(&buf, header_end, &mode)?;
    let destination = resolve_destination(&method, &target, &head_text)?;
    let keep_alive = connection_keep_alive(&version, &head_text);

    let _ = decoded_body; // request bodies are not separately surfaced; raw carries them.
    Ok(Some(ParsedRequest {
        raw: buf,
        method,
        destination,
        keep_alive,
    }))
}

/// Reads one complete response off `stream`.
pub fn read_response(stream: &mut TcpStream) -> Result<ParsedResponse, HttpParseError> {
    let mut buf = read_until_header_end(stream)?.ok_or(HttpParseError::HeaderIncomplete)?;
    let header_end = find_header_end(&buf).expect("read_until_header_end guarantees this");
    let head_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head_text.lines();
    let status_line = lines.next().ok_or(HttpParseError::BadStatusLine)?;
    let status_code = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or(HttpParseError::BadStatusLine)?;
    let version = status_line
        .split_whitespace()
        .next()
        .unwrap_or("HTTP/1.1")
        .to_string();

    let mode = body_mode(&head_text, false, Some(status_code));
    fill_body(stream, &mut buf, header_end, &mode)?;

    let decoded_body = extract_body(&buf, header_end, &mode)?;
    let keep_alive = connection_keep_alive(&version, &head_text);

    Ok(ParsedResponse {
        raw: buf,
        status_code,
        decoded_body,
        keep_alive,
    })
}

fn body_mode(headers_text: &str, is_request: bool, status_code: Option<u16>) -> BodyMode {
    if let Some(code) = status_code {
        if (100..200).contains(&code) || code == 204 || code == 304 {
            return BodyMode::Empty;
        }
    }
    if let Some(te) = header_value(headers_text, "Transfer-Encoding") {
        if te.to_ascii_lowercase().contains("chunked") {
            return BodyMode::Chunked;
        }
    }
    if let Some(cl) = header_value(headers_text, "Content-Length") {
        if let Ok(n) = cl.trim().parse::<usize>() {
            return BodyMode::Fixed(n);
        }
    }
    if is_request {
        BodyMode::Empty
    } else {
        BodyMode::UntilClose
    }
}

fn fill_body(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
    header_end: usize,
    mode: &BodyMode,
) -> Result<(), HttpParseError> {
    match mode {
        BodyMode::Empty => Ok(()),
        BodyMode::Fixed(n) => {
            let target_len = header_end + n;
            while buf.len() < target_len {
                read_more(stream, buf)?.ok_or(HttpParseError::BodyIncomplete)?;
            }
            Ok(())
        }
        BodyMode::Chunked => loop {
            match chunked::decode(&buf[header_end..])? {
                Some(_) => return Ok(()),
                None => {
                    read_more(stream, buf)?.ok_or(HttpParseError::BodyIncomplete)?;
                }
            }
        },
        BodyMode::UntilClose => loop {
            match read_more(stream, buf)? {
                Some(_) => continue,
                None => return Ok(()),
            }
        },
    }
}

fn extract_body(
    buf: &[u8],
    header_end: usize,
    mode: &BodyMode,
) -> Result<Vec<u8>, HttpParseError> {
    match mode {
        BodyMode::Empty => Ok(Vec::new()),
        BodyMode::Fixed(n) => Ok(buf[header_end..header_end + n].to_vec()),
        BodyMode::Chunked => {
            let (decoded, _) = chunked::decode(&buf[header_end..])?
                .expect("fill_body guarantees a complete chunked body");
            Ok(decoded)
        }
        BodyMode::UntilClose => Ok(buf[header_end..].to_vec()),
    }
}

fn resolve_destination(
    method: &str,
    target: &str,
    headers_text: &str,
) -> Result<Destination, HttpParseError> {
    if method.eq_ignore_ascii_case("CONNECT") {
        let (host, port_str) = target
            .rsplit_once(':')
            .ok_or(HttpParseError::NoDestination)?;
        let port: u16 = port_str.parse().map_err(|_| HttpParseError::NoDestination)?;
        return Ok(Destination::Connect {
            host: host.to_string(),
            port,
        });
    }
    let host_header = header_value(headers_text, "Host").ok_or(HttpParseError::NoDestination)?;
    let (host, port) = match host_header.rsplit_once(':') {
        Some((h, p)) => match p.parse::<u16>() {
            Ok(port) => (h.to_string(), port),
            Err(_) => (host_header.to_string(), 80),
        },
        None => (host_header.to_string(), 80),
    };
    Ok(Destination::Forward { host, port })
}

fn connection_keep_alive(version: &str, headers_text: &str) -> bool {
    let connection = header_value(headers_text, "Connection").map(str::to_ascii_lowercase);
    let is_1_1 = version.contains("1.1");
    match connection.as_deref() {
        Some("close") => false,
        Some("keep-alive") => true,
        _ => is_1_1,
    }
}

/// Reads until the buffer contains a full `\r\n\r\n`-terminated header
/// block. Returns `Ok(None)` only if the peer closed before any byte at all
/// arrived.
fn read_until_header_end(stream: &mut TcpStream) -> Result<Option<Vec<u8>>, HttpParseError> {
    let mut buf = Vec::new();
    loop {
        if find_header_end(&buf).is_some() {
            return Ok(Some(buf));
        }
        match read_more(stream, &mut buf)? {
            Some(_) => continue,
            None => {
                if buf.is_empty() {
                    return Ok(None);
                }
                return Err(HttpParseError::HeaderIncomplete);
            }
        }
    }
}

/// Reads one chunk of available bytes into `buf`. Returns `Ok(Some(n))` with
/// the number of bytes appended, or `Ok(None)` if the peer closed.
fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Result<Option<usize>, HttpParseError> {
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(None),
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                return Ok(Some(n));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HttpParseError::Io(e)),
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    fn roundtrip_request(raw: &'static [u8]) -> ParsedRequest {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut client = TcpStream::connect(addr).unwrap();
            client.write_all(raw).unwrap();
        });
        let (mut server_side, _) = listener.accept().unwrap();
        let parsed = read_request(&mut server_side).unwrap().unwrap();
        handle.join().unwrap();
        parsed
    }

    fn roundtrip_response(raw: &'static [u8]) -> ParsedResponse {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut client = TcpStream::connect(addr).unwrap();
            client.write_all(raw).unwrap();
            client.shutdown(std::net::Shutdown::Write).ok();
        });
        let (mut server_side, _) = listener.accept().unwrap();
        let parsed = read_response(&mut server_side).unwrap();
        handle.join().unwrap();
        parsed
    }

    #[test]
    fn host_header_without_port_defaults_to_80() {
        let req = roundtrip_request(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert_eq!(
            req.destination,
            Destination::Forward {
                host: "example.com".to_string(),
                port: 80
            }
        );
    }

    #[test]
    fn connect_target_with_port() {
        let req = roundtrip_request(b"CONNECT foo:443 HTTP/1.1\r\nHost: foo:443\r\n\r\n");
        assert_eq!(
            req.destination,
            Destination::Connect {
                host: "foo".to_string(),
                port: 443
            }
        );
    }

    #[test]
    fn request_with_content_length_reads_body() {
        let req = roundtrip_request(
            b"POST /upload HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello",
        );
        assert!(req.raw.ends_with(b"hello"));
    }

    #[test]
    fn response_content_length_zero_has_empty_body() {
        let resp =
            roundtrip_response(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert!(resp.decoded_body.is_empty());
    }

    #[test]
    fn response_204_has_no_body_even_with_trailing_bytes() {
        // 204 must not attempt a body read; a well-behaved origin sends
        // nothing further, so the read completes on header block alone.
        let resp = roundtrip_response(b"HTTP/1.1 204 No Content\r\n\r\n");
        assert_eq!(resp.status_code, 204);
        assert!(resp.decoded_body.is_empty());
    }

    #[test]
    fn response_chunked_body_is_decoded() {
        let resp = roundtrip_response(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n0\r\n\r\n",
        );
        assert_eq!(resp.decoded_body, b"Wiki");
    }

    #[test]
    fn response_without_length_reads_until_close() {
        let resp = roundtrip_response(b"HTTP/1.0 200 OK\r\n\r\nwhatever remains");
        assert_eq!(resp.decoded_body, b"whatever remains");
        assert!(!resp.keep_alive);
    }

    #[test]
    fn http_1_0_defaults_to_close_unless_keep_alive_requested() {
        let req = roundtrip_request(b"GET / HTTP/1.0\r\nHost: a\r\n\r\n");
        assert!(!req.keep_alive);
        let req = roundtrip_request(
            b"GET / HTTP/1.0\r\nHost: a\r\nConnection: keep-alive\r\n\r\n",
        );
        assert!(req.keep_alive);
    }

    #[test]
    fn http_1_1_defaults_to_keep_alive_unless_close_requested() {
        let req = roundtrip_request(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");
        assert!(req.keep_alive);
        let req =
            roundtrip_request(b"GET / HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n");
        assert!(!req.keep_alive);
    }
}
