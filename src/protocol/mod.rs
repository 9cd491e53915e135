//! The binary file-transfer protocol: streaming command parser plus the
//! IDENTIFY/GET_FILE/PUT_FILE/ENUMERATE handlers and their ACK discipline.

use crate::blobstore::{BlobError, BlobStore};
use crate::logger::{LogEvent, Logger};
use crate::server::RequestHandler;
use crate::wire::io::{recv_some, send_all, WireError};
use crate::wire::{CommandHeader, CommandId, FileHeader, ReplyStatus};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Adapts [`FileProtocolEngine`] to the generic server's [`RequestHandler`].
pub struct FileServerHandler {
    engine: FileProtocolEngine,
}

impl FileServerHandler {
    pub fn new(store: Arc<dyn BlobStore>, logger: Arc<dyn Logger>) -> Self {
        FileServerHandler {
            engine: FileProtocolEngine::new(store, logger),
        }
    }
}

impl RequestHandler for FileServerHandler {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        self.engine.handle_connection(stream, peer.to_string());
    }
}

/// Drives the command loop for one file-protocol connection.
pub struct FileProtocolEngine {
    store: Arc<dyn BlobStore>,
    logger: Arc<dyn Logger>,
}

impl FileProtocolEngine {
    pub fn new(store: Arc<dyn BlobStore>, logger: Arc<dyn Logger>) -> Self {
        FileProtocolEngine { store, logger }
    }

    /// Reads and dispatches commands from `stream` until the peer closes or
    /// an unrecoverable I/O error occurs.
    pub fn handle_connection(&self, mut stream: TcpStream, client_id: String) {
        let mut buf: Vec<u8> = Vec::new();
        // Set once `dispatch_put_file_header` has sent the first ACK and is
        // waiting on the nested `FileHeader` + payload; cleared once the
        // second ACK/NACK for that same PUT_FILE has gone out.
        let mut awaiting_put_body: Option<String> = None;
        loop {
            match self.try_extract_and_dispatch(
                &mut stream,
                &mut buf,
                &client_id,
                &mut awaiting_put_body,
            ) {
                Ok(true) => continue, // a command was consumed; try for another immediately
                Ok(false) => {}       // need more bytes
                Err(_) => return,     // unrecoverable I/O error; drop the connection
            }
            match recv_some(&mut stream, 4096) {
                Ok(chunk) if chunk.is_empty() => return, // peer closed
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(_) => return,
            }
        }
    }

    /// Attempts to parse and fully handle one command out of `buf`.
    /// Returns `Ok(true)` if a command was consumed, `Ok(false)` if `buf`
    /// doesn't yet hold a complete command (the caller should read more).
    fn try_extract_and_dispatch(
        &self,
        stream: &mut TcpStream,
        buf: &mut Vec<u8>,
        client_id: &str,
        awaiting_put_body: &mut Option<String>,
    ) -> Result<bool, ProtocolError> {
        if awaiting_put_body.is_some() {
            return self.dispatch_put_file_body(stream, buf, client_id, awaiting_put_body);
        }
        let Some(header) = CommandHeader::parse(buf) else {
            return Ok(false);
        };
        match header.command {
            CommandId::Identify => {
                let id = String::from_utf8_lossy(&buf[CommandHeader::WIRE_LEN..]).into_owned();
                self.logger.log(LogEvent::CommandReceived {
                    client_id: client_id.to_string(),
                    command: format!("IDENTIFY {id}"),
                });
                buf.clear();
                Ok(true)
            }
            CommandId::GetFile => self.dispatch_get_file(stream, buf, client_id),
            CommandId::PutFile => {
                self.dispatch_put_file_header(stream, buf, client_id, awaiting_put_body)
            }
            CommandId::Enumerate => {
                self.logger.log(LogEvent::CommandReceived {
                    client_id: client_id.to_string(),
                    command: "ENUMERATE".to_string(),
                });
                buf.drain(..CommandHeader::WIRE_LEN);
                Ok(true)
            }
        }
    }

    fn dispatch_get_file(
        &self,
        stream: &mut TcpStream,
        buf: &mut Vec<u8>,
        client_id: &str,
    ) -> Result<bool, ProtocolError> {
        let cursor = CommandHeader::WIRE_LEN;
        if buf.len() < cursor + 2 {
            return Ok(false);
        }
        let path_len = crate::wire::read_u16_le(&buf[cursor..cursor + 2]) as usize;
        let path_end = cursor + 2 + path_len;
        if buf.len() < path_end {
            return Ok(false);
        }
        let path = String::from_utf8_lossy(&buf[cursor + 2..path_end]).into_owned();

        self.logger.log(LogEvent::CommandReceived {
            client_id: client_id.to_string(),
            command: format!("GET_FILE {path}"),
        });

        match self.store.load(&path) {
            Ok(contents) => {
                send_all(stream, &[ReplyStatus::Ack.to_byte()])?;
                let header = FileHeader {
                    permissions: 0o644,
                    path: path.clone(),
                    file_size: contents.len() as u64,
                };
                send_all(stream, &header.encode())?;
                send_all(stream, &contents)?;
                self.logger.log(LogEvent::CommandResult {
                    client_id: client_id.to_string(),
                    result: format!("GET_FILE {path}: sent {} bytes", contents.len()),
                });
            }
            Err(BlobError::NotFound(_)) => {
                send_all(stream, &[ReplyStatus::Invalid.to_byte()])?;
                self.logger.log(LogEvent::CommandResult {
                    client_id: client_id.to_string(),
                    result: format!("GET_FILE {path}: not found"),
                });
            }
            Err(e) => {
                send_all(stream, &[ReplyStatus::Nack.to_byte()])?;
                self.logger.log(LogEvent::CommandResult {
                    client_id: client_id.to_string(),
                    result: format!("GET_FILE {path}: store error: {e}"),
                });
            }
        }
        buf.drain(..path_end);
        Ok(true)
    }

    /// Parses only the command-section path and sends the **first** ACK as
    /// soon as it is available — before the nested `FileHeader` or file
    /// payload necessarily exist in `buf`. This is the point of the
    /// two-ACK handshake: a client that writes the command+path, waits for
    /// this byte, and only then streams a (potentially large) file body
    /// must see the ACK without the server first demanding the whole body.
    fn dispatch_put_file_header(
        &self,
        stream: &mut TcpStream,
        buf: &mut Vec<u8>,
        client_id: &str,
        awaiting_put_body: &mut Option<String>,
    ) -> Result<bool, ProtocolError> {
        let cursor = CommandHeader::WIRE_LEN;
        if buf.len() < cursor + 2 {
            return Ok(false);
        }
        let cmd_path_len = crate::wire::read_u16_le(&buf[cursor..cursor + 2]) as usize;
        let cmd_path_end = cursor + 2 + cmd_path_len;
        if buf.len() < cmd_path_end {
            return Ok(false);
        }
        let cmd_path = String::from_utf8_lossy(&buf[cursor + 2..cmd_path_end]).into_owned();

        self.logger.log(LogEvent::CommandReceived {
            client_id: client_id.to_string(),
            command: format!("PUT_FILE {cmd_path}"),
        });

        send_all(stream, &[ReplyStatus::Ack.to_byte()])?;

        buf.drain(..cmd_path_end);
        *awaiting_put_body = Some(cmd_path);
        Ok(true)
    }

    /// Parses the `FileHeader` and its payload once both are fully
    /// buffered, persists the file, and sends the second status byte.
    /// Returns `Ok(false)` (need more bytes) until the whole payload has
    /// arrived; the caller keeps re-entering this stage (via
    /// `awaiting_put_body`) rather than re-parsing the command section.
    fn dispatch_put_file_body(
        &self,
        stream: &mut TcpStream,
        buf: &mut Vec<u8>,
        client_id: &str,
        awaiting_put_body: &mut Option<String>,
    ) -> Result<bool, ProtocolError> {
        let Some((file_header, header_consumed)) = FileHeader::parse(buf) else {
            return Ok(false);
        };
        let file_end = header_consumed + file_header.file_size as usize;
        if buf.len() < file_end {
            return Ok(false);
        }

        let file_data = &buf[header_consumed..file_end];
        match self
            .store
            .store(&file_header.path, file_data, file_header.permissions)
        {
            Ok(()) => {
                send_all(stream, &[ReplyStatus::Ack.to_byte()])?;
                self.logger.log(LogEvent::CommandResult {
                    client_id: client_id.to_string(),
                    result: format!("PUT_FILE {}: saved {} bytes", file_header.path, file_data.len()),
                });
            }
            Err(e) => {
                send_all(stream, &[ReplyStatus::Nack.to_byte()])?;
                self.logger.log(LogEvent::CommandResult {
                    client_id: client_id.to_string(),
                    result: format!("PUT_FILE {}: store error: {e}", file_header.path),
                });
            }
        }

        buf.drain(..file_end);
        *awaiting_put_body = None;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::DiskBlobStore;
    use crate::logger::StderrLogger;
    use crate::wire::write_u16_le;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn spawn_engine(store_root: &std::path::Path) -> (std::net::SocketAddr, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(DiskBlobStore::new(store_root));
        let logger = Arc::new(StderrLogger);
        let engine = FileProtocolEngine::new(store, logger);
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            engine.handle_connection(stream, "test-client".to_string());
        });
        (addr, handle)
    }

    #[test]
    fn put_then_get_round_trips_over_the_wire() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, handle) = spawn_engine(dir.path());
        let mut client = TcpStream::connect(addr).unwrap();

        // PUT_FILE "hello.txt" <- b"hi there"
        let mut msg = Vec::new();
        msg.extend_from_slice(&CommandHeader { command: CommandId::PutFile }.encode());
        let cmd_path = b"hello.txt";
        msg.extend_from_slice(&write_u16_le(cmd_path.len() as u16));
        msg.extend_from_slice(cmd_path);
        let file_header = FileHeader {
            permissions: 0o644,
            path: "hello.txt".to_string(),
            file_size: 8,
        };
        msg.extend_from_slice(&file_header.encode());
        msg.extend_from_slice(b"hi there");
        client.write_all(&msg).unwrap();

        let mut ack1 = [0u8; 1];
        client.read_exact(&mut ack1).unwrap();
        assert_eq!(ack1[0], ReplyStatus::Ack.to_byte());
        let mut ack2 = [0u8; 1];
        client.read_exact(&mut ack2).unwrap();
        assert_eq!(ack2[0], ReplyStatus::Ack.to_byte());

        // GET_FILE "hello.txt"
        let mut msg = Vec::new();
        msg.extend_from_slice(&CommandHeader { command: CommandId::GetFile }.encode());
        msg.extend_from_slice(&write_u16_le(cmd_path.len() as u16));
        msg.extend_from_slice(cmd_path);
        client.write_all(&msg).unwrap();

        let mut ack = [0u8; 1];
        client.read_exact(&mut ack).unwrap();
        assert_eq!(ack[0], ReplyStatus::Ack.to_byte());

        let mut header_prefix = [0u8; 4];
        client.read_exact(&mut header_prefix).unwrap();
        let path_len = crate::wire::read_u16_le(&header_prefix[2..4]) as usize;
        let mut path_buf = vec![0u8; path_len];
        client.read_exact(&mut path_buf).unwrap();
        let mut size_buf = [0u8; 8];
        client.read_exact(&mut size_buf).unwrap();
        let size = crate::wire::read_u64_le(&size_buf);
        let mut data = vec![0u8; size as usize];
        client.read_exact(&mut data).unwrap();
        assert_eq!(data, b"hi there");

        drop(client);
        handle.join().unwrap();
    }

    /// A conformant client writes the command+path, blocks on the first
    /// ACK, and only then streams the (here, deliberately withheld) file
    /// body. If the server waited for the whole payload before sending the
    /// first ACK, this test would hang until the harness times it out.
    #[test]
    fn put_file_sends_first_ack_before_body_is_available() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, handle) = spawn_engine(dir.path());
        let mut client = TcpStream::connect(addr).unwrap();

        let cmd_path = b"split.txt";
        let mut cmd_section = Vec::new();
        cmd_section.extend_from_slice(&CommandHeader { command: CommandId::PutFile }.encode());
        cmd_section.extend_from_slice(&write_u16_le(cmd_path.len() as u16));
        cmd_section.extend_from_slice(cmd_path);
        client.write_all(&cmd_section).unwrap();

        let mut ack1 = [0u8; 1];
        client.read_exact(&mut ack1).unwrap();
        assert_eq!(ack1[0], ReplyStatus::Ack.to_byte());

        let file_header = FileHeader {
            permissions: 0o644,
            path: "split.txt".to_string(),
            file_size: 4,
        };
        let mut body_section = file_header.encode();
        body_section.extend_from_slice(b"body");
        client.write_all(&body_section).unwrap();

        let mut ack2 = [0u8; 1];
        client.read_exact(&mut ack2).unwrap();
        assert_eq!(ack2[0], ReplyStatus::Ack.to_byte());

        drop(client);
        handle.join().unwrap();
        assert_eq!(std::fs::read(dir.path().join("split.txt")).unwrap(), b"body");
    }

    #[test]
    fn get_file_missing_returns_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, handle) = spawn_engine(dir.path());
        let mut client = TcpStream::connect(addr).unwrap();

        let mut msg = Vec::new();
        msg.extend_from_slice(&CommandHeader { command: CommandId::GetFile }.encode());
        let path = b"nope.txt";
        msg.extend_from_slice(&write_u16_le(path.len() as u16));
        msg.extend_from_slice(path);
        client.write_all(&msg).unwrap();

        let mut status = [0u8; 1];
        client.read_exact(&mut status).unwrap();
        assert_eq!(status[0], ReplyStatus::Invalid.to_byte());

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn identify_sends_no_reply_byte() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, handle) = spawn_engine(dir.path());
        let mut client = TcpStream::connect(addr).unwrap();

        let mut msg = Vec::new();
        msg.extend_from_slice(&CommandHeader { command: CommandId::Identify }.encode());
        msg.extend_from_slice(b"client-42");
        client.write_all(&msg).unwrap();
        client.shutdown(std::net::Shutdown::Write).unwrap();

        // No reply is expected; the connection should just be closed by the
        // server once it sees EOF.
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert!(buf.is_empty());

        handle.join().unwrap();
    }
}
