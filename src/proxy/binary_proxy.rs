//! The binary transport proxy: reads a fixed 6-byte destination header, then
//! blindly tunnels bytes to and from the destination.

use super::tunnel;
use crate::logger::{LogEvent, Logger};
use crate::server::RequestHandler;
use crate::wire::io::{connect_to_host, recv_exact};
use crate::wire::ProxyHeader;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

pub struct BinaryProxyHandler {
    logger: Arc<dyn Logger>,
}

impl BinaryProxyHandler {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        BinaryProxyHandler { logger }
    }
}

impl RequestHandler for BinaryProxyHandler {
    fn handle(&self, mut client: TcpStream, peer: SocketAddr) {
        self.logger.log(LogEvent::ConnectionOpened {
            peer: peer.to_string(),
        });

        let header_bytes = match recv_exact(&mut client, ProxyHeader::WIRE_LEN) {
            Ok(b) => b,
            Err(_) => return,
        };
        let header = match ProxyHeader::parse(&header_bytes) {
            Some(h) => h,
            None => return,
        };
        let host = header.dest_ip_string();
        let port = header.dest_port;

        let upstream = match connect_to_host(&host, port) {
            Ok(u) => u,
            Err(_) => return,
        };

        self.logger.log(LogEvent::TunnelOpened {
            destination: format!("{host}:{port}"),
        });
        tunnel::pump(client, upstream, &self.logger, format!("{host}:{port}"));
    }
}
