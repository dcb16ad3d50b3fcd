//! `/etc/hosts`-style static source: `ip fqdn [alias...]` per line.

use super::SourceAdapter;
use async_trait::async_trait;
use gudgeon_domain::{DomainError, Question, RecordData, RecordType, Response, ResourceRecord};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

/// Static records never expire on their own; the cache still clamps this
/// against `global_max_ttl` like any other answer.
const STATIC_TTL: u32 = 3600;

pub struct HostFileSource {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl HostFileSource {
    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let text = std::fs::read_to_string(path).map_err(|e| DomainError::ListLoad {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut entries: HashMap<String, Vec<IpAddr>> = HashMap::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(addr) = parts.next().and_then(|a| a.parse::<IpAddr>().ok()) else {
                continue;
            };
            for name in parts {
                entries
                    .entry(gudgeon_domain::normalize_name(name))
                    .or_default()
                    .push(addr);
            }
        }

        Ok(Self { entries })
    }
}

#[async_trait]
impl SourceAdapter for HostFileSource {
    async fn resolve(&self, question: &Question) -> Result<Response, DomainError> {
        let Some(addrs) = self.entries.get(question.normalized_name()) else {
            return Err(DomainError::NxDomain);
        };

        let answers: Vec<ResourceRecord> = addrs
            .iter()
            .filter_map(|addr| match (question.record_type, addr) {
                (RecordType::A, IpAddr::V4(v4)) => Some(ResourceRecord::new(
                    question.normalized_name(),
                    STATIC_TTL,
                    RecordData::A(*v4),
                )),
                (RecordType::Aaaa, IpAddr::V6(v6)) => Some(ResourceRecord::new(
                    question.normalized_name(),
                    STATIC_TTL,
                    RecordData::Aaaa(*v6),
                )),
                _ => None,
            })
            .collect();

        if answers.is_empty() {
            return Ok(Response::no_error(Vec::new()));
        }
        Ok(Response::no_error(answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn resolves_a_record_from_hosts_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.5 router.lan").unwrap();
        let source = HostFileSource::load(file.path()).unwrap();

        let question = Question::new("router.lan", RecordType::A);
        let response = source.resolve(&question).await.unwrap();
        assert_eq!(response.answers.len(), 1);
    }

    #[tokio::test]
    async fn unknown_name_is_nxdomain() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.5 router.lan").unwrap();
        let source = HostFileSource::load(file.path()).unwrap();

        let question = Question::new("unknown.lan", RecordType::A);
        assert!(matches!(
            source.resolve(&question).await,
            Err(DomainError::NxDomain)
        ));
    }
}
