//! Gudgeon infrastructure layer: the concrete adapters behind the
//! application ports — rule store compilation, per-group response caching,
//! leaf sources, wire transport, the resolver graph, and the DNS server
//! handler that ties them to `hickory-server`.

pub mod cache;
pub mod forwarding;
pub mod resolver;
pub mod rule_store;
pub mod server;
pub mod source;
pub mod transport;

pub use cache::InMemoryCache;
pub use resolver::ResolverGraph;
pub use rule_store::RuleStoreEngine;
pub use server::DnsServerHandler;
pub use source::{DnsSource, HostFileSource, SourceAdapter, ZoneFileSource};
pub use transport::{create_transport, DnsTransport, Transport};
