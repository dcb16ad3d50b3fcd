use crate::errors::DomainError;
use crate::group::DEFAULT_GROUP;
use crate::rule::{RuleAction, RuleStoreBackend};
use crate::source::SourceSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rule_store: RuleStoreConfig,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
    #[serde(default)]
    pub lists: Vec<ListConfig>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub resolvers: Vec<ResolverConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            dns_port: default_dns_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_dns_port() -> u16 {
    53
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity_per_group: usize,
    #[serde(default = "default_global_min_ttl")]
    pub global_min_ttl: u32,
    #[serde(default = "default_global_max_ttl")]
    pub global_max_ttl: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_per_group: default_cache_capacity(),
            global_min_ttl: default_global_min_ttl(),
            global_max_ttl: default_global_max_ttl(),
        }
    }
}

fn default_cache_capacity() -> usize {
    20_000
}

fn default_global_min_ttl() -> u32 {
    0
}

fn default_global_max_ttl() -> u32 {
    86_400
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RuleStoreBackendConfig {
    #[default]
    Memory,
    Hash32,
    Hash64,
    Bloom,
    Sqlite,
    BloomSqlite,
    HashSqlite,
}

impl From<RuleStoreBackendConfig> for RuleStoreBackend {
    fn from(v: RuleStoreBackendConfig) -> Self {
        match v {
            RuleStoreBackendConfig::Memory => RuleStoreBackend::Memory,
            RuleStoreBackendConfig::Hash32 => RuleStoreBackend::Hash32,
            RuleStoreBackendConfig::Hash64 => RuleStoreBackend::Hash64,
            RuleStoreBackendConfig::Bloom => RuleStoreBackend::Bloom,
            RuleStoreBackendConfig::Sqlite => RuleStoreBackend::Sqlite,
            RuleStoreBackendConfig::BloomSqlite => RuleStoreBackend::BloomSqlite,
            RuleStoreBackendConfig::HashSqlite => RuleStoreBackend::HashSqlite,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleStoreConfig {
    #[serde(default)]
    pub backend: RuleStoreBackendConfig,
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

impl Default for RuleStoreConfig {
    fn default() -> Self {
        Self {
            backend: RuleStoreBackendConfig::default(),
            sqlite_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default = "default_block_response")]
    pub block_response: String,
    /// Resolver names this group dispatches to, in order. Empty falls back
    /// to the resolver named `default`.
    #[serde(default)]
    pub resolvers: Vec<String>,
}

fn default_block_response() -> String {
    "NXDOMAIN".to_string()
}

impl GroupConfig {
    pub fn to_group(&self) -> Result<crate::Group, crate::DomainError> {
        let mut group = crate::Group::with_block_response(
            self.name.clone(),
            crate::BlockResponse::parse(&self.block_response)?,
        );
        group.resolvers = self.resolvers.clone();
        Ok(group)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IpMatchConfig {
    Ip(String),
    Range { from: String, to: String },
    Cidr(String),
}

impl IpMatchConfig {
    pub fn to_ip_match(&self) -> Result<crate::group::IpMatch, DomainError> {
        use crate::group::IpMatch;
        Ok(match self {
            IpMatchConfig::Ip(ip) => IpMatch::Exact(
                ip.parse()
                    .map_err(|_| DomainError::InvalidIpAddress(ip.clone()))?,
            ),
            IpMatchConfig::Range { from, to } => IpMatch::Range(
                from.parse()
                    .map_err(|_| DomainError::InvalidIpAddress(from.clone()))?,
                to.parse()
                    .map_err(|_| DomainError::InvalidIpAddress(to.clone()))?,
            ),
            IpMatchConfig::Cidr(cidr) => {
                let (network, prefix_len) = cidr
                    .split_once('/')
                    .ok_or_else(|| DomainError::InvalidCidr(cidr.clone()))?;
                IpMatch::Cidr {
                    network: network
                        .parse()
                        .map_err(|_| DomainError::InvalidCidr(cidr.clone()))?,
                    prefix_len: prefix_len
                        .parse()
                        .map_err(|_| DomainError::InvalidCidr(cidr.clone()))?,
                }
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsumerConfig {
    pub name: String,
    #[serde(flatten)]
    pub ip_match: IpMatchConfig,
    pub groups: Vec<String>,
    /// Short-circuits this consumer to a blocked response regardless of
    /// group rules.
    #[serde(default)]
    pub block: bool,
}

impl ConsumerConfig {
    pub fn to_consumer(&self) -> Result<crate::group::Consumer, DomainError> {
        let mut consumer = crate::group::Consumer::new(
            self.name.clone(),
            self.ip_match.to_ip_match()?,
            self.groups.clone(),
        );
        consumer.block = self.block;
        Ok(consumer)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListActionConfig {
    Allow,
    Block,
}

impl From<ListActionConfig> for RuleAction {
    fn from(v: ListActionConfig) -> Self {
        match v {
            ListActionConfig::Allow => RuleAction::Allow,
            ListActionConfig::Block => RuleAction::Block,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListConfig {
    pub path: String,
    pub action: ListActionConfig,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceKindConfig {
    Hostfile {
        path: String,
    },
    Zonefile {
        path: String,
        origin: String,
    },
    Dns {
        upstreams: Vec<String>,
        #[serde(default = "default_true")]
        recursion_desired: bool,
    },
    Named {
        name: String,
    },
}

fn default_true() -> bool {
    true
}

impl SourceKindConfig {
    pub fn into_spec(self) -> Result<SourceSpec, DomainError> {
        Ok(match self {
            SourceKindConfig::Hostfile { path } => SourceSpec::HostFile { path },
            SourceKindConfig::Zonefile { path, origin } => SourceSpec::ZoneFile { path, origin },
            SourceKindConfig::Dns {
                upstreams,
                recursion_desired,
            } => {
                let upstreams = upstreams
                    .iter()
                    .map(|s| {
                        s.parse::<crate::protocol::Protocol>()
                            .map(crate::source::Upstream::new)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                SourceSpec::Dns {
                    upstreams,
                    recursion_desired,
                }
            }
            SourceKindConfig::Named { name } => SourceSpec::Named { name },
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKindConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BalanceConfig {
    #[default]
    Sequential,
    RoundRobin,
}

impl From<BalanceConfig> for crate::resolver_def::BalanceStrategy {
    fn from(v: BalanceConfig) -> Self {
        match v {
            BalanceConfig::Sequential => crate::resolver_def::BalanceStrategy::Sequential,
            BalanceConfig::RoundRobin => crate::resolver_def::BalanceStrategy::RoundRobin,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub search: Vec<String>,
    #[serde(default)]
    pub balance: BalanceConfig,
    pub sources: Vec<String>,
}

impl ResolverConfig {
    pub fn to_resolver_def(&self) -> crate::resolver_def::ResolverDef {
        crate::resolver_def::ResolverDef {
            name: self.name.clone(),
            domains: self.domains.clone(),
            search: self.search.clone(),
            balance: self.balance.into(),
            sources: self.sources.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, DomainError> {
        let path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::discover_path(),
        };

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default_with_groups()
        };

        config.apply_cli_overrides(overrides);
        Ok(config)
    }

    fn default_with_groups() -> Self {
        let mut config = Config::default();
        config.groups.push(GroupConfig {
            name: DEFAULT_GROUP.to_string(),
            block_response: default_block_response(),
            resolvers: Vec::new(),
        });
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, DomainError> {
        let text = std::fs::read_to_string(path).map_err(|e| DomainError::ListLoad {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| DomainError::TomlParse(e.to_string()))
    }

    fn discover_path() -> PathBuf {
        let local = PathBuf::from("gudgeon.toml");
        if local.exists() {
            return local;
        }
        PathBuf::from("/etc/gudgeon/config.toml")
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.groups.is_empty() {
            return Err(DomainError::InvalidConfig(
                "at least one group must be configured".into(),
            ));
        }

        let group_names: std::collections::HashSet<&str> =
            self.groups.iter().map(|g| g.name.as_str()).collect();

        for consumer in &self.consumers {
            for group in &consumer.groups {
                if !group_names.contains(group.as_str()) {
                    return Err(DomainError::InvalidConfig(format!(
                        "consumer '{}' references unknown group '{}'",
                        consumer.name, group
                    )));
                }
            }
        }

        let source_names: std::collections::HashSet<&str> =
            self.sources.iter().map(|s| s.name.as_str()).collect();
        let resolver_names: std::collections::HashSet<&str> =
            self.resolvers.iter().map(|r| r.name.as_str()).collect();

        for resolver in &self.resolvers {
            if resolver.sources.is_empty() {
                return Err(DomainError::InvalidConfig(format!(
                    "resolver '{}' must reference at least one source",
                    resolver.name
                )));
            }
            for source in &resolver.sources {
                if !source_names.contains(source.as_str())
                    && !resolver_names.contains(source.as_str())
                {
                    return Err(DomainError::InvalidConfig(format!(
                        "resolver '{}' references unknown source '{}'",
                        resolver.name, source
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), DomainError> {
        let text = if path.exists() {
            let existing = std::fs::read_to_string(path).map_err(|e| DomainError::ListLoad {
                path: path.display().to_string(),
                source: e,
            })?;
            let mut doc: toml_edit::DocumentMut = existing
                .parse()
                .map_err(|e: toml_edit::TomlError| DomainError::TomlParse(e.to_string()))?;
            let fresh = toml::to_string_pretty(self)
                .map_err(|e| DomainError::TomlSerialize(e.to_string()))?;
            let fresh_doc: toml_edit::DocumentMut = fresh
                .parse()
                .map_err(|e: toml_edit::TomlError| DomainError::TomlParse(e.to_string()))?;
            for (key, item) in fresh_doc.iter() {
                doc[key] = item.clone();
            }
            doc.to_string()
        } else {
            toml::to_string_pretty(self).map_err(|e| DomainError::TomlSerialize(e.to_string()))?
        };

        std::fs::write(path, text).map_err(|e| DomainError::ListLoad {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_groups() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_default_group_only() {
        let mut config = Config::default();
        config.groups.push(GroupConfig {
            name: "default".into(),
            block_response: default_block_response(),
            resolvers: Vec::new(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_dangling_consumer_group_reference() {
        let mut config = Config::default();
        config.groups.push(GroupConfig {
            name: "default".into(),
            block_response: default_block_response(),
            resolvers: Vec::new(),
        });
        config.consumers.push(ConsumerConfig {
            name: "laptop".into(),
            ip_match: IpMatchConfig::Ip("10.0.0.5".into()),
            groups: vec!["kids".into()],
            block: false,
        });
        assert!(config.validate().is_err());
    }
}
