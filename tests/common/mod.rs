//! Integration test common infrastructure.
//!
//! The crate under test is the IRC client, so the fixtures play the server:
//! [`MockServer`] accepts the session's connection and hands back a
//! [`ServerPeer`] that scripts the server side line by line. [`serve_bytes`]
//! stands in for a bot's DCC listener.

pub mod peer;
pub mod server;

#[allow(unused_imports)]
pub use peer::ServerPeer;
#[allow(unused_imports)]
pub use server::{MockServer, serve_bytes, zip_listing};
