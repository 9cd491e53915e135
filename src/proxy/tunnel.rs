//! Bidirectional byte pump used by both the CONNECT tunnel and the binary
//! transport proxy. Implemented as two threads, one per direction, using
//! `try_clone` the way the corpus's own TCP<->WebSocket bridge splits reader
//! and writer halves of a duplex socket.

use crate::logger::{LogEvent, Logger};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const CHUNK_SIZE: usize = 8192;

/// Pumps bytes between `client` and `upstream` in both directions until
/// either side closes, then logs a summary with byte counts and duration.
/// Blocks until both directions have finished.
pub fn pump(client: TcpStream, upstream: TcpStream, logger: &Arc<dyn Logger>, destination: String) {
    let start = Instant::now();
    let bytes_up = Arc::new(AtomicU64::new(0));
    let bytes_down = Arc::new(AtomicU64::new(0));

    let client_writer = match client.try_clone() {
        Ok(c) => c,
        Err(_) => return,
    };
    let upstream_writer = match upstream.try_clone() {
        Ok(u) => u,
        Err(_) => return,
    };

    let up_counter = Arc::clone(&bytes_up);
    let mut up_reader = client;
    let mut up_writer = upstream_writer;
    let up_handle = std::thread::spawn(move || {
        copy_and_count(&mut up_reader, &mut up_writer, &up_counter);
        up_writer.shutdown(Shutdown::Both).ok();
        up_reader.shutdown(Shutdown::Both).ok();
    });

    let down_counter = Arc::clone(&bytes_down);
    let mut down_reader = upstream;
    let mut down_writer = client_writer;
    let down_handle = std::thread::spawn(move || {
        copy_and_count(&mut down_reader, &mut down_writer, &down_counter);
        down_writer.shutdown(Shutdown::Both).ok();
        down_reader.shutdown(Shutdown::Both).ok();
    });

    up_handle.join().ok();
    down_handle.join().ok();

    logger.log(LogEvent::TunnelClosed {
        bytes_up: bytes_up.load(Ordering::SeqCst),
        bytes_down: bytes_down.load(Ordering::SeqCst),
        duration_secs: start.elapsed().as_secs_f64(),
    });
    let _ = destination;
}

fn copy_and_count(reader: &mut TcpStream, writer: &mut TcpStream, counter: &AtomicU64) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                if writer.write_all(&buf[..n]).is_err() {
                    return;
                }
                counter.fetch_add(n as u64, Ordering::SeqCst);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}
