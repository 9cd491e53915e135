//! Blocking socket I/O helpers shared by the file protocol and both proxies.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("connection closed by peer")]
    Closed,
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves `host:port` and connects to the first address the resolver
/// offers, trying subsequent addresses on connection failure.
pub fn connect_to_host(host: &str, port: u16) -> Result<TcpStream, WireError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(WireError::Io)?
        .collect::<Vec<_>>();
    if addrs.is_empty() {
        return Err(WireError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no addresses for {host}:{port}"),
        )));
    }
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(WireError::Io(last_err.unwrap()))
}

/// Writes the entire buffer, looping past partial writes.
pub fn send_all(stream: &mut TcpStream, mut buf: &[u8]) -> Result<(), WireError> {
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => return Err(WireError::Closed),
            Ok(n) => buf = &buf[n..],
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(())
}

/// One read, up to `max` bytes. Returns an empty vec on peer close.
pub fn recv_some(stream: &mut TcpStream, max: usize) -> Result<Vec<u8>, WireError> {
    let mut buf = vec![0u8; max];
    loop {
        match stream.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::Io(e)),
        }
    }
}

/// Reads exactly `n` bytes, or fails with `ShortRead`/`Closed` if the peer
/// disconnects first.
pub fn recv_exact(stream: &mut TcpStream, n: usize) -> Result<Vec<u8>, WireError> {
    let mut out = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        match stream.read(&mut out[filled..]) {
            Ok(0) => {
                return Err(WireError::ShortRead {
                    expected: n,
                    got: filled,
                });
            }
            Ok(read) => filled += read,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(out)
}
