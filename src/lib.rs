//! kindling - e-book search and download over IRC.
//!
//! Connects to an IRC network, asks a channel's search bot for a listing of
//! matching files, and fetches the chosen file over DCC. The same pieces run
//! the other way round as a small serving bot.
//!
//! - [`session`]: the IRC connection, its message bus and background replies
//! - [`dcc`]: DCC SEND transfers in both roles, with RESUME
//! - [`search`]: search and download requests, listing parsing
//! - [`bot`]: the serving bot
//!
//! Wire formats live in the `kindling-proto` crate.

pub mod bot;
pub mod config;
pub mod dcc;
pub mod error;
pub mod network;
pub mod progress;
pub mod search;
pub mod session;
pub mod telemetry;
pub mod token;

pub use config::Config;
pub use error::{SearchError, SessionError, TransferError};
pub use search::{SearchClient, SearchOutcome, SearchResult};
pub use session::IrcSession;
