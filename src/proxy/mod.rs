//! The two proxy personalities (HTTP content filter, binary transport) and
//! the bidirectional tunnel they share once a destination is connected.

pub mod binary_proxy;
pub mod http_proxy;
pub mod tunnel;

pub use binary_proxy::BinaryProxyHandler;
pub use http_proxy::HttpProxyHandler;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Wire(#[from] crate::wire::io::WireError),
    #[error(transparent)]
    Http(#[from] crate::http::HttpParseError),
}
