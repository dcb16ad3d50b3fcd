//! Raw DNS message delivery over UDP, TCP (length-prefixed), and
//! DNS-over-TLS. Enum-dispatched rather than `Box<dyn>`, so the hot UDP
//! path pays no vtable indirection.

pub mod tcp;
pub mod tls;
pub mod udp;

use async_trait::async_trait;
use gudgeon_domain::{DomainError, Protocol};
use std::time::Duration;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,
    pub protocol_used: &'static str,
}

#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(&self, message: &[u8], timeout: Duration) -> Result<TransportResponse, DomainError>;
    fn protocol_name(&self) -> &'static str;
}

pub enum Transport {
    Udp(udp::UdpTransport),
    Tcp(tcp::TcpTransport),
    Tls(tls::TlsTransport),
}

impl Transport {
    pub async fn send(
        &self,
        message: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        match self {
            Self::Udp(t) => t.send(message, timeout).await,
            Self::Tcp(t) => t.send(message, timeout).await,
            Self::Tls(t) => t.send(message, timeout).await,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Udp(_) => "UDP",
            Self::Tcp(_) => "TCP",
            Self::Tls(_) => "TLS",
        }
    }
}

pub fn create_transport(protocol: &Protocol) -> Result<Transport, DomainError> {
    match protocol {
        Protocol::Udp { addr } => Ok(Transport::Udp(udp::UdpTransport::new(*addr))),
        Protocol::Tcp { addr } => Ok(Transport::Tcp(tcp::TcpTransport::new(*addr))),
        Protocol::TcpTls { addr, hostname } => {
            Ok(Transport::Tls(tls::TlsTransport::new(*addr, hostname.clone())))
        }
    }
}
