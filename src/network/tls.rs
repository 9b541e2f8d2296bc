//! Client-side TLS for IRC connections.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{info, warn};

use crate::error::SessionError;

/// Upgrade a TCP stream to TLS, verifying the server against the system roots.
pub async fn connect(host: &str, tcp_stream: TcpStream) -> Result<TlsStream<TcpStream>, SessionError> {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "Failed to add root cert");
        }
    }
    for e in &certs.errors {
        warn!(error = %e, "Error loading native certs");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tls_error = |reason: String| SessionError::Tls {
        host: host.to_string(),
        reason,
    };
    let server_name = ServerName::try_from(host.to_string()).map_err(|e| tls_error(e.to_string()))?;
    let stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| tls_error(e.to_string()))?;

    info!(host = %host, "TLS handshake completed");
    Ok(stream)
}
