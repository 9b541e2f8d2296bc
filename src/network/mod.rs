//! Network module.
//!
//! Contains the line transport the IRC session runs on: plain TCP or
//! client-side TLS, framed into protocol lines.

mod tls;
mod transport;

pub use transport::{Connection, LineReader, LineWriter};
