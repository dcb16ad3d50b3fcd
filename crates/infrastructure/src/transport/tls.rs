//! DNS-over-TLS client transport (RFC 7858). A shared `ClientConfig` is
//! built once so rustls' session cache can resume handshakes; idle
//! connections are pooled per (addr, hostname) to amortize the cost
//! further.

use super::tcp::{read_with_length_prefix, send_with_length_prefix};
use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use dashmap::DashMap;
use gudgeon_domain::DomainError;
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

const MAX_IDLE_PER_HOST: usize = 2;

static SHARED_TLS_CONFIG: LazyLock<Arc<rustls::ClientConfig>> = LazyLock::new(|| {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
});

static TLS_POOL: LazyLock<DashMap<(SocketAddr, String), Vec<TlsStream<TcpStream>>>> =
    LazyLock::new(DashMap::new);

pub struct TlsTransport {
    server_addr: SocketAddr,
    hostname: String,
}

impl TlsTransport {
    pub fn new(server_addr: SocketAddr, hostname: String) -> Self {
        Self {
            server_addr,
            hostname,
        }
    }

    fn take_pooled(&self) -> Option<TlsStream<TcpStream>> {
        let key = (self.server_addr, self.hostname.clone());
        let mut entry = TLS_POOL.get_mut(&key)?;
        entry.pop()
    }

    fn return_to_pool(&self, stream: TlsStream<TcpStream>) {
        let key = (self.server_addr, self.hostname.clone());
        let mut entry = TLS_POOL.entry(key).or_default();
        if entry.len() < MAX_IDLE_PER_HOST {
            entry.push(stream);
        }
    }

    async fn connect_new(&self, timeout: Duration) -> Result<TlsStream<TcpStream>, DomainError> {
        let connector = tokio_rustls::TlsConnector::from(SHARED_TLS_CONFIG.clone());
        let server_name = ServerName::try_from(self.hostname.clone())
            .map_err(|_| DomainError::InvalidDomainName(self.hostname.clone()))?;

        let tcp_stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| DomainError::QueryTimeout)?
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        let tls_stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp_stream))
            .await
            .map_err(|_| DomainError::QueryTimeout)?
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        debug!(server = %self.server_addr, hostname = %self.hostname, "TLS connection established");
        Ok(tls_stream)
    }

    async fn send_on_stream(
        &self,
        stream: &mut TlsStream<TcpStream>,
        message: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        tokio::time::timeout(timeout, send_with_length_prefix(stream, message))
            .await
            .map_err(|_| DomainError::QueryTimeout)??;
        tokio::time::timeout(timeout, read_with_length_prefix(stream))
            .await
            .map_err(|_| DomainError::QueryTimeout)?
    }
}

#[async_trait]
impl DnsTransport for TlsTransport {
    async fn send(
        &self,
        message: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        if let Some(mut stream) = self.take_pooled() {
            if let Ok(bytes) = self.send_on_stream(&mut stream, message, timeout).await {
                self.return_to_pool(stream);
                return Ok(TransportResponse {
                    bytes,
                    protocol_used: "TLS",
                });
            }
            debug!(server = %self.server_addr, "pooled TLS connection stale, reconnecting");
        }

        let mut stream = self.connect_new(timeout).await?;
        let bytes = self.send_on_stream(&mut stream, message, timeout).await?;
        self.return_to_pool(stream);

        Ok(TransportResponse {
            bytes,
            protocol_used: "TLS",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TLS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_config_builds() {
        let _ = &*SHARED_TLS_CONFIG;
    }
}
