//! The file-transfer protocol's client side: encodes the same commands the
//! server decodes in `crate::protocol`.

use crate::wire::io::{connect_to_host, recv_exact, send_all, WireError};
use crate::wire::{write_u16_le, CommandHeader, CommandId, FileHeader, ReplyStatus};
use std::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("could not resolve {0} to an IPv4 address")]
    NoIpv4(String),
    #[error("server replied with an unrecognized status byte {0}")]
    UnknownStatus(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetFileOutcome {
    Saved(Vec<u8>),
    NotFound,
    ServerError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutFileOutcome {
    Accepted,
    Rejected,
}

pub struct FileClient {
    stream: TcpStream,
}

impl FileClient {
    /// Connects directly to a file server at `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let stream = connect_to_host(host, port)?;
        Ok(FileClient { stream })
    }

    /// Connects through the binary transport proxy at `proxy_host:proxy_port`,
    /// which then tunnels to the real file server at `host:port`.
    pub fn connect_via_proxy(
        host: &str,
        port: u16,
        proxy_host: &str,
        proxy_port: u16,
    ) -> Result<Self, ClientError> {
        let mut stream = connect_to_host(proxy_host, proxy_port)?;
        let dest_ip = resolve_ipv4(host, port)?;
        let mut header = Vec::with_capacity(6);
        header.extend_from_slice(&dest_ip);
        header.extend_from_slice(&port.to_be_bytes());
        send_all(&mut stream, &header)?;
        Ok(FileClient { stream })
    }

    pub fn identify(&mut self, client_id: &str) -> Result<(), ClientError> {
        let mut msg = CommandHeader {
            command: CommandId::Identify,
        }
        .encode()
        .to_vec();
        msg.extend_from_slice(client_id.as_bytes());
        send_all(&mut self.stream, &msg)?;
        Ok(())
    }

    pub fn get_file(&mut self, path: &str) -> Result<GetFileOutcome, ClientError> {
        let mut msg = CommandHeader {
            command: CommandId::GetFile,
        }
        .encode()
        .to_vec();
        let path_bytes = path.as_bytes();
        msg.extend_from_slice(&write_u16_le(path_bytes.len() as u16));
        msg.extend_from_slice(path_bytes);
        send_all(&mut self.stream, &msg)?;

        let status = recv_exact(&mut self.stream, 1)?[0];
        if status == ReplyStatus::Invalid.to_byte() {
            return Ok(GetFileOutcome::NotFound);
        }
        if status == ReplyStatus::Nack.to_byte() || status == ReplyStatus::Error.to_byte() {
            return Ok(GetFileOutcome::ServerError);
        }
        if status != ReplyStatus::Ack.to_byte() {
            return Err(ClientError::UnknownStatus(status));
        }

        let prefix = recv_exact(&mut self.stream, 4)?;
        let path_len = crate::wire::read_u16_le(&prefix[2..4]) as usize;
        let path_bytes = recv_exact(&mut self.stream, path_len)?;
        let size_bytes = recv_exact(&mut self.stream, 8)?;
        let size = crate::wire::read_u64_le(&size_bytes) as usize;
        let data = recv_exact(&mut self.stream, size)?;
        let _ = path_bytes;
        Ok(GetFileOutcome::Saved(data))
    }

    pub fn put_file(
        &mut self,
        path: &str,
        data: &[u8],
        mode: u16,
    ) -> Result<PutFileOutcome, ClientError> {
        let mut msg = CommandHeader {
            command: CommandId::PutFile,
        }
        .encode()
        .to_vec();
        let path_bytes = path.as_bytes();
        msg.extend_from_slice(&write_u16_le(path_bytes.len() as u16));
        msg.extend_from_slice(path_bytes);
        let header = FileHeader {
            permissions: mode,
            path: path.to_string(),
            file_size: data.len() as u64,
        };
        msg.extend_from_slice(&header.encode());
        msg.extend_from_slice(data);
        send_all(&mut self.stream, &msg)?;

        let first = recv_exact(&mut self.stream, 1)?[0];
        if first != ReplyStatus::Ack.to_byte() {
            return Err(ClientError::UnknownStatus(first));
        }
        let second = recv_exact(&mut self.stream, 1)?[0];
        if second == ReplyStatus::Ack.to_byte() {
            Ok(PutFileOutcome::Accepted)
        } else {
            Ok(PutFileOutcome::Rejected)
        }
    }
}

fn resolve_ipv4(host: &str, port: u16) -> Result<[u8; 4], ClientError> {
    (host, port)
        .to_socket_addrs()?
        .find_map(|addr| match addr {
            std::net::SocketAddr::V4(v4) => Some(v4.ip().octets()),
            std::net::SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| ClientError::NoIpv4(host.to_string()))
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Wire(WireError::Io(e))
    }
}
