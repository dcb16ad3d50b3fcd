//! Static zone file source: a fixed set of records replayed verbatim for
//! queries under the zone's origin. Format per line: `name ttl type rdata`,
//! blank lines and `;`-comments ignored. `@` in `name` expands to the origin.

use super::SourceAdapter;
use async_trait::async_trait;
use gudgeon_domain::{normalize_name, DomainError, Question, RecordData, RecordType, Response, ResourceRecord};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

pub struct ZoneFileSource {
    origin: String,
    records: Vec<ResourceRecord>,
}

impl ZoneFileSource {
    pub fn load(path: &Path, origin: &str) -> Result<Self, DomainError> {
        let text = std::fs::read_to_string(path).map_err(|e| DomainError::ListLoad {
            path: path.display().to_string(),
            source: e,
        })?;

        let origin = normalize_name(origin);
        let mut records = Vec::new();

        for line in text.lines() {
            let line = line.split(';').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                continue;
            }

            let name = if parts[0] == "@" {
                origin.clone()
            } else {
                normalize_name(parts[0])
            };
            let Ok(ttl) = parts[1].parse::<u32>() else {
                continue;
            };
            let Ok(record_type) = parts[2].parse::<RecordType>() else {
                continue;
            };
            let rdata = parts[3..].join(" ");

            let data = match record_type {
                RecordType::A => rdata.parse::<Ipv4Addr>().ok().map(RecordData::A),
                RecordType::Aaaa => rdata.parse::<Ipv6Addr>().ok().map(RecordData::Aaaa),
                RecordType::Cname => Some(RecordData::Cname(normalize_name(&rdata))),
                RecordType::Txt => Some(RecordData::Txt(vec![rdata])),
                _ => None,
            };

            if let Some(data) = data {
                records.push(ResourceRecord::new(name, ttl, data));
            }
        }

        Ok(Self { origin, records })
    }

    fn covers(&self, name: &str) -> bool {
        name == self.origin || name.ends_with(&format!(".{}", self.origin))
    }
}

#[async_trait]
impl SourceAdapter for ZoneFileSource {
    async fn resolve(&self, question: &Question) -> Result<Response, DomainError> {
        if !self.covers(question.normalized_name()) {
            return Err(DomainError::NxDomain);
        }

        let answers: Vec<ResourceRecord> = self
            .records
            .iter()
            .filter(|r| r.name == question.normalized_name() && r.record_type() == question.record_type)
            .cloned()
            .collect();

        Ok(Response::no_error(answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn resolves_a_record_within_origin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "@ 300 A 10.0.0.1").unwrap();
        writeln!(file, "www.home.lan 300 A 10.0.0.2").unwrap();
        let source = ZoneFileSource::load(file.path(), "home.lan").unwrap();

        let question = Question::new("www.home.lan", RecordType::A);
        let response = source.resolve(&question).await.unwrap();
        assert_eq!(response.answers.len(), 1);
    }

    #[tokio::test]
    async fn rejects_names_outside_origin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "@ 300 A 10.0.0.1").unwrap();
        let source = ZoneFileSource::load(file.path(), "home.lan").unwrap();

        let question = Question::new("example.com", RecordType::A);
        assert!(matches!(
            source.resolve(&question).await,
            Err(DomainError::NxDomain)
        ));
    }
}
