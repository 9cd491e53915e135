//! Crate-wide error rollup, used by `main` to report a single exit path.

use crate::blobstore::BlobError;
use crate::config::ConfigError;
use crate::forbidden::ForbiddenLoadError;
use crate::http::HttpParseError;
use crate::protocol::ProtocolError;
use crate::proxy::ProxyError;
use crate::wire::io::WireError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Http(#[from] HttpParseError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    ForbiddenLoad(#[from] ForbiddenLoadError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
