//! Logging setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects the `debug` level and
/// the default is `info`.
pub fn init(debug: bool, json: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;

    use tracing::{Span, info_span};

    /// Create a span for an IRC connection.
    pub fn session(host: &str, nick: &str) -> Span {
        info_span!("session", host = %host, nick = %nick)
    }

    /// Create a span for one DCC transfer.
    pub fn transfer(filename: &str, peer: SocketAddr) -> Span {
        info_span!("transfer", filename = %filename, peer = %peer)
    }

    /// Create a span for a search or download request.
    pub fn request(kind: &'static str, subject: &str) -> Span {
        info_span!("request", kind = kind, subject = %subject)
    }
}
