use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("invalid CIDR format: {0}")]
    InvalidCidr(String),

    #[error("invalid protocol spec: {0}")]
    InvalidProtocol(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("list load error for {path}: {source}")]
    ListLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule store backend error: {0}")]
    RuleStore(String),

    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("resolver not found: {0}")]
    ResolverNotFound(String),

    #[error("resolver {0} does not handle this domain")]
    ResolverSkipped(String),

    #[error("resolver cycle detected: {0}")]
    ResolverCycle(String),

    #[error("recursion not desired")]
    RecursionNotDesired,

    #[error("query timeout")]
    QueryTimeout,

    #[error("query blocked")]
    Blocked,

    #[error("no healthy source available")]
    NoHealthySource,

    #[error("all sources exhausted")]
    SourcesExhausted,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("nxdomain")]
    NxDomain,

    #[error("toml parse error: {0}")]
    TomlParse(String),

    #[error("toml serialize error: {0}")]
    TomlSerialize(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
