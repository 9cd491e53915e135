//! The thread-per-connection accept loop shared by every listening mode.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

/// Implemented once per mode (file server, binary proxy, HTTP proxy). Each
/// accepted connection gets its own worker thread that calls `handle` and
/// then lets the socket drop.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, stream: TcpStream, peer: std::net::SocketAddr);
}

pub struct Server<H: RequestHandler> {
    listener: TcpListener,
    handler: Arc<H>,
}

impl<H: RequestHandler> Server<H> {
    pub fn bind(port: u16, handler: H) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        Ok(Server {
            listener,
            handler: Arc::new(handler),
        })
    }

    pub fn local_port(&self) -> std::io::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Runs the accept loop forever. A failed accept is logged and skipped;
    /// it does not bring down the listener.
    pub fn run(&self) -> ! {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let handler = Arc::clone(&self.handler);
                    std::thread::Builder::new()
                        .name(format!("relaysuite-conn-{peer}"))
                        .spawn(move || handler.handle(stream, peer))
                        .ok();
                }
                Err(e) => {
                    eprintln!("accept failed: {e}");
                }
            }
        }
    }
}
