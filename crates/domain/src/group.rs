use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The synthetic reply a group returns for a blocked query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockResponse {
    NxDomain,
    Endpoint,
    Ip(IpAddr),
}

impl Default for BlockResponse {
    fn default() -> Self {
        BlockResponse::NxDomain
    }
}

impl BlockResponse {
    /// Parses `NXDOMAIN`, `ENDPOINT` (case-insensitive), or a literal IP
    /// address, per spec.md's `blockResponse` field.
    pub fn parse(raw: &str) -> Result<Self, crate::DomainError> {
        match raw.to_ascii_uppercase().as_str() {
            "NXDOMAIN" => Ok(BlockResponse::NxDomain),
            "ENDPOINT" => Ok(BlockResponse::Endpoint),
            _ => raw
                .parse::<IpAddr>()
                .map(BlockResponse::Ip)
                .map_err(|_| crate::DomainError::InvalidConfig(format!("invalid blockResponse: {raw}"))),
        }
    }
}

/// A named filtering/caching domain. Rules, resolvers and the cache are all
/// scoped per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub block_response: BlockResponse,
    /// Resolver names to try, in order, for a query that falls through to
    /// this group. Empty means "fall back to the resolver named `default`".
    pub resolvers: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_response: BlockResponse::default(),
            resolvers: Vec::new(),
        }
    }

    pub fn with_block_response(name: impl Into<String>, block_response: BlockResponse) -> Self {
        Self {
            name: name.into(),
            block_response,
            resolvers: Vec::new(),
        }
    }

    /// The resolver names this group dispatches to, in order, falling back
    /// to the resolver named `default` when none are configured.
    pub fn effective_resolvers(&self) -> Vec<&str> {
        if self.resolvers.is_empty() {
            vec![DEFAULT_RESOLVER]
        } else {
            self.resolvers.iter().map(String::as_str).collect()
        }
    }
}

pub const DEFAULT_GROUP: &str = "default";
pub const DEFAULT_RESOLVER: &str = "default";

/// How a consumer's IP address was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpMatch {
    Exact(IpAddr),
    Range(IpAddr, IpAddr),
    Cidr { network: IpAddr, prefix_len: u8 },
}

impl IpMatch {
    pub fn matches(&self, ip: IpAddr) -> bool {
        match self {
            IpMatch::Exact(addr) => *addr == ip,
            IpMatch::Range(lo, hi) => ip_in_range(ip, *lo, *hi),
            IpMatch::Cidr { network, prefix_len } => ip_in_cidr(ip, *network, *prefix_len),
        }
    }
}

fn ip_in_range(ip: IpAddr, lo: IpAddr, hi: IpAddr) -> bool {
    match (ip, lo, hi) {
        (IpAddr::V4(ip), IpAddr::V4(lo), IpAddr::V4(hi)) => {
            u32::from(ip) >= u32::from(lo) && u32::from(ip) <= u32::from(hi)
        }
        (IpAddr::V6(ip), IpAddr::V6(lo), IpAddr::V6(hi)) => {
            u128::from(ip) >= u128::from(lo) && u128::from(ip) <= u128::from(hi)
        }
        _ => false,
    }
}

fn ip_in_cidr(ip: IpAddr, network: IpAddr, prefix_len: u8) -> bool {
    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            let mask = if prefix_len == 0 {
                0u32
            } else {
                u32::MAX << (32 - prefix_len.min(32))
            };
            (u32::from(ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            let mask = if prefix_len == 0 {
                0u128
            } else {
                u128::MAX << (128 - prefix_len.min(128))
            };
            (u128::from(ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

/// A client-IP classification rule mapping to one or more groups. Consumers
/// are matched in declaration order; the first whose `ip_match` matches the
/// client wins.
#[derive(Debug, Clone)]
pub struct Consumer {
    pub name: String,
    pub ip_match: IpMatch,
    pub groups: Vec<String>,
    /// Short-circuits to a blocked response before any group/rule lookup.
    pub block: bool,
}

impl Consumer {
    pub fn new(name: impl Into<String>, ip_match: IpMatch, groups: Vec<String>) -> Self {
        Self {
            name: name.into(),
            ip_match,
            groups,
            block: false,
        }
    }
}

/// Picks the matching consumer for a client IP: first-match by declaration
/// order, full stop.
pub fn classify<'a>(consumers: &'a [Consumer], ip: IpAddr) -> Option<&'a Consumer> {
    consumers.iter().find(|c| c.ip_match.matches(ip))
}

pub fn unspecified_v4() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

pub fn unspecified_v6() -> IpAddr {
    IpAddr::V6(Ipv6Addr::UNSPECIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_declared_match_wins_regardless_of_specificity() {
        let ip: IpAddr = "192.168.1.5".parse().unwrap();
        let consumers = vec![
            Consumer::new(
                "subnet",
                IpMatch::Cidr {
                    network: "192.168.1.0".parse().unwrap(),
                    prefix_len: 24,
                },
                vec!["kids".into()],
            ),
            Consumer::new("host", IpMatch::Exact(ip), vec!["adults".into()]),
        ];

        let matched = classify(&consumers, ip).unwrap();
        assert_eq!(matched.name, "subnet");
    }

    #[test]
    fn later_declared_consumer_is_unreachable_once_an_earlier_one_matches() {
        let ip: IpAddr = "192.168.1.5".parse().unwrap();
        let consumers = vec![
            Consumer::new("host", IpMatch::Exact(ip), vec!["adults".into()]),
            Consumer::new(
                "subnet",
                IpMatch::Cidr {
                    network: "192.168.1.0".parse().unwrap(),
                    prefix_len: 24,
                },
                vec!["kids".into()],
            ),
        ];

        let matched = classify(&consumers, ip).unwrap();
        assert_eq!(matched.name, "host");
    }

    #[test]
    fn cidr_match() {
        let network: IpAddr = "10.0.0.0".parse().unwrap();
        assert!(ip_in_cidr("10.0.0.5".parse().unwrap(), network, 24));
        assert!(!ip_in_cidr("10.0.1.5".parse().unwrap(), network, 24));
    }
}
