//! TCP transport (RFC 1035 §4.2.2): a 2-byte big-endian length prefix
//! precedes every message in both directions.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use gudgeon_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;

pub struct TcpTransport {
    server_addr: SocketAddr,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| DomainError::QueryTimeout)?
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        tokio::time::timeout(timeout, send_with_length_prefix(&mut stream, message))
            .await
            .map_err(|_| DomainError::QueryTimeout)??;

        let bytes = tokio::time::timeout(timeout, read_with_length_prefix(&mut stream))
            .await
            .map_err(|_| DomainError::QueryTimeout)??;

        Ok(TransportResponse {
            bytes,
            protocol_used: "TCP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

pub(crate) async fn send_with_length_prefix<S>(
    stream: &mut S,
    message: &[u8],
) -> Result<(), DomainError>
where
    S: AsyncWriteExt + Unpin,
{
    let length = (message.len() as u16).to_be_bytes();
    stream
        .write_all(&length)
        .await
        .map_err(|e| DomainError::Transport(e.to_string()))?;
    stream
        .write_all(message)
        .await
        .map_err(|e| DomainError::Transport(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| DomainError::Transport(e.to_string()))
}

pub(crate) async fn read_with_length_prefix<S>(stream: &mut S) -> Result<Vec<u8>, DomainError>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| DomainError::Transport(e.to_string()))?;
    let len = u16::from_be_bytes(len_buf) as usize;
    if len > MAX_TCP_MESSAGE_SIZE {
        return Err(DomainError::Transport(format!(
            "response length {len} exceeds max TCP message size"
        )));
    }
    let mut response = vec![0u8; len];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| DomainError::Transport(e.to_string()))?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_is_big_endian() {
        let bytes = 300u16.to_be_bytes();
        assert_eq!(bytes, [0x01, 0x2C]);
    }
}
