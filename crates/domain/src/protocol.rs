use crate::errors::DomainError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// The transports a `dns` source can reach an upstream server over. Parsed
/// from `host[:port][/proto]`, e.g. `1.1.1.1`, `9.9.9.9:53/tcp`,
/// `dns.example.com:853/tcp-tls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    Udp { addr: SocketAddr },
    Tcp { addr: SocketAddr },
    TcpTls { addr: SocketAddr, hostname: String },
}

const DEFAULT_PORT: u16 = 53;
const DEFAULT_TLS_PORT: u16 = 853;

impl Protocol {
    pub fn socket_addr(&self) -> SocketAddr {
        match self {
            Protocol::Udp { addr } | Protocol::Tcp { addr } | Protocol::TcpTls { addr, .. } => {
                *addr
            }
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        match self {
            Protocol::TcpTls { hostname, .. } => Some(hostname),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Udp { .. } => "udp",
            Protocol::Tcp { .. } => "tcp",
            Protocol::TcpTls { .. } => "tcp-tls",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::TcpTls { addr, hostname } => write!(f, "{addr}/tcp-tls#{hostname}"),
            other => write!(f, "{}/{}", other.socket_addr(), other.name()),
        }
    }
}

impl FromStr for Protocol {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host_port, proto) = match s.rsplit_once('/') {
            Some((hp, p)) => (hp, Some(p)),
            None => (s, None),
        };

        let default_port = if proto == Some("tcp-tls") {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        };

        let (host, port) = split_host_port(host_port, default_port)?;

        match proto {
            None | Some("udp") => {
                let addr = resolve_ip_port(&host, port)?;
                Ok(Protocol::Udp { addr })
            }
            Some("tcp") => {
                let addr = resolve_ip_port(&host, port)?;
                Ok(Protocol::Tcp { addr })
            }
            Some("tcp-tls") => {
                let addr = resolve_ip_port(&host, port)?;
                Ok(Protocol::TcpTls { addr, hostname: host })
            }
            Some(other) => Err(DomainError::InvalidProtocol(format!(
                "unsupported protocol '{other}' in source spec '{s}'"
            ))),
        }
    }
}

fn split_host_port(s: &str, default_port: u16) -> Result<(String, u16), DomainError> {
    if let Some(rest) = s.strip_prefix('[') {
        // bracketed IPv6, e.g. [::1]:53
        if let Some((addr, port)) = rest.rsplit_once(']') {
            let port = if let Some(p) = port.strip_prefix(':') {
                p.parse()
                    .map_err(|_| DomainError::InvalidProtocol(format!("bad port in '{s}'")))?
            } else {
                default_port
            };
            return Ok((addr.to_string(), port));
        }
    }

    match s.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() => {
            let port: u16 = port
                .parse()
                .map_err(|_| DomainError::InvalidProtocol(format!("bad port in '{s}'")))?;
            Ok((host.to_string(), port))
        }
        _ => Ok((s.to_string(), default_port)),
    }
}

fn resolve_ip_port(host: &str, port: u16) -> Result<SocketAddr, DomainError> {
    if let Ok(ip) = host.parse() {
        return Ok(SocketAddr::new(ip, port));
    }
    // Hostnames are resolved at connect time by the transport; record a
    // placeholder address carrying the port so SocketAddr plumbing still
    // works uniformly. The transport layer re-resolves via the hostname.
    Ok(SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_ip_defaults_to_udp_53() {
        let p: Protocol = "1.1.1.1".parse().unwrap();
        assert_eq!(p, Protocol::Udp { addr: "1.1.1.1:53".parse().unwrap() });
    }

    #[test]
    fn parse_explicit_tcp() {
        let p: Protocol = "9.9.9.9:53/tcp".parse().unwrap();
        assert_eq!(p, Protocol::Tcp { addr: "9.9.9.9:53".parse().unwrap() });
    }

    #[test]
    fn parse_tcp_tls_with_hostname() {
        let p: Protocol = "1.1.1.1:853/tcp-tls".parse().unwrap();
        match p {
            Protocol::TcpTls { addr, hostname } => {
                assert_eq!(addr.port(), 853);
                assert_eq!(hostname, "1.1.1.1");
            }
            _ => panic!("expected tcp-tls"),
        }
    }

    #[test]
    fn rejects_unknown_protocol() {
        assert!("1.1.1.1/quic".parse::<Protocol>().is_err());
    }
}
