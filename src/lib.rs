//! A dual-purpose network relay: a binary file-transfer protocol
//! server/client and an HTTP/1.1 content-filtering forward proxy, sharing a
//! thread-per-connection server substrate.

pub mod blobstore;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod forbidden;
pub mod http;
pub mod logger;
pub mod protocol;
pub mod proxy;
pub mod repl;
pub mod responder;
pub mod server;
pub mod wire;

pub use error::RelayError;
