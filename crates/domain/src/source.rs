use crate::protocol::Protocol;

/// An upstream DNS server reachable over one of the supported transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub protocol: Protocol,
}

impl Upstream {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

/// A configured origin of answers. Sources are tagged-variant, not
/// `Box<dyn Trait>`, so the resolver can match on kind without indirection
/// for the declarative parts; the runtime behavior (worker pool, file
/// watch) lives in the infrastructure adapter keyed by the same name.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// A `/etc/hosts`-style file: `ip fqdn [alias...]` per line.
    HostFile { path: String },
    /// A static zone file replayed as answers for queries under its origin.
    ZoneFile { path: String, origin: String },
    /// A pool of upstream DNS servers reached over UDP/TCP/TCP-TLS.
    Dns {
        upstreams: Vec<Upstream>,
        recursion_desired: bool,
    },
    /// A reference to another named resolver, so resolvers can compose.
    /// Cycle detection happens at request time via a visited-set, not by
    /// rejecting the reference up front (a resolver graph may legitimately
    /// contain a name reachable via more than one path).
    Named { name: String },
}

impl SourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::HostFile { .. } => "hostfile",
            SourceSpec::ZoneFile { .. } => "zonefile",
            SourceSpec::Dns { .. } => "dns",
            SourceSpec::Named { .. } => "named",
        }
    }
}

/// Named source entry as it appears under `[sources.<name>]` in config.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub spec: SourceSpec,
}

impl Source {
    pub fn new(name: impl Into<String>, spec: SourceSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// Tunables for the worker pool backing a `dns` source, per the pressure
/// controller contract: a bounded channel of depth `queue_depth` feeding
/// `min_workers..=max_workers` workers that scale down after `idle_timeout`
/// of no work, back off `backoff` after a transport error, and bound each
/// request to `write_deadline` to flush the query and `read_deadline` to
/// read the response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerPoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_depth: usize,
    pub idle_timeout: std::time::Duration,
    pub write_deadline: std::time::Duration,
    pub read_deadline: std::time::Duration,
    pub backoff: std::time::Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 0,
            max_workers: 25,
            queue_depth: 100,
            idle_timeout: std::time::Duration::from_secs(10),
            write_deadline: std::time::Duration::from_secs(1),
            read_deadline: std::time::Duration::from_secs(2),
            backoff: std::time::Duration::from_millis(500),
        }
    }
}
