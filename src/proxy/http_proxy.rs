//! Per-connection HTTP/1.1 forward proxy: read, filter, forward, filter,
//! forward, then decide whether to keep the client connection alive.

use super::tunnel;
use crate::filter::ContentFilter;
use crate::http::{self, Destination, HttpParseError};
use crate::logger::{LogEvent, Logger};
use crate::responder;
use crate::server::RequestHandler;
use crate::wire::io::{connect_to_host, send_all};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

pub struct HttpProxyHandler {
    filter: Arc<ContentFilter>,
    logger: Arc<dyn Logger>,
}

impl HttpProxyHandler {
    pub fn new(filter: Arc<ContentFilter>, logger: Arc<dyn Logger>) -> Self {
        HttpProxyHandler { filter, logger }
    }

    fn run_connection(&self, mut client: TcpStream) {
        loop {
            let request = match http::read_request(&mut client) {
                Ok(None) => return, // clean keep-alive close
                Ok(Some(r)) => r,
                Err(HttpParseError::NoDestination) | Err(HttpParseError::BadStatusLine) => {
                    send_all(&mut client, &responder::build_400("malformed request")).ok();
                    return;
                }
                Err(_) => return,
            };

            let request_text = String::from_utf8_lossy(&request.raw).into_owned();
            let matches = self.filter.scan(&request_text);
            if !matches.is_empty() {
                let words: Vec<String> = matches.into_iter().map(|m| m.word).collect();
                send_all(&mut client, &responder::build_403(&words)).ok();
                self.logger.log(LogEvent::Rejected {
                    reason: "request contains forbidden content".to_string(),
                    terms: words,
                });
                return;
            }

            let (host, port) = request.destination.host_port();
            let (host, port) = (host.to_string(), port);

            match &request.destination {
                Destination::Connect { .. } => {
                    let upstream = match connect_to_host(&host, port) {
                        Ok(u) => u,
                        Err(e) => {
                            send_all(&mut client, &responder::build_502(&e.to_string())).ok();
                            return;
                        }
                    };
                    send_all(&mut client, b"HTTP/1.1 200 Connection Established\r\n\r\n").ok();
                    self.logger.log(LogEvent::TunnelOpened {
                        destination: format!("{host}:{port}"),
                    });
                    tunnel::pump(client, upstream, &self.logger, format!("{host}:{port}"));
                    return;
                }
                Destination::Forward { .. } => {
                    let mut upstream = match connect_to_host(&host, port) {
                        Ok(u) => u,
                        Err(e) => {
                            send_all(&mut client, &responder::build_502(&e.to_string())).ok();
                            return;
                        }
                    };

                    let stripped = http::remove_header(&request.raw, "Accept-Encoding");
                    if send_all(&mut upstream, &stripped).is_err() {
                        return;
                    }
                    self.logger.log(LogEvent::RequestForwarded {
                        method: request.method.clone(),
                        destination: format!("{host}:{port}"),
                    });

                    let response = match http::read_response(&mut upstream) {
                        Ok(r) => r,
                        Err(_) => return,
                    };
                    self.logger.log(LogEvent::ResponseStatus {
                        status_code: response.status_code,
                    });

                    let body_text = String::from_utf8_lossy(&response.decoded_body).into_owned();
                    let matches = self.filter.scan(&body_text);
                    if !matches.is_empty() {
                        let words: Vec<String> = matches.into_iter().map(|m| m.word).collect();
                        send_all(&mut client, &responder::build_503(&words)).ok();
                        self.logger.log(LogEvent::Rejected {
                            reason: "response contains forbidden content".to_string(),
                            terms: words,
                        });
                        return;
                    }

                    if send_all(&mut client, &response.raw).is_err() {
                        return;
                    }

                    if !(request.keep_alive && response.keep_alive) {
                        return;
                    }
                    // loop: read the next request on the same client connection
                }
            }
        }
    }
}

impl RequestHandler for HttpProxyHandler {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        self.logger.log(LogEvent::ConnectionOpened {
            peer: peer.to_string(),
        });
        self.run_connection(stream);
        self.logger.log(LogEvent::ConnectionClosed {
            peer: peer.to_string(),
        });
    }
}
