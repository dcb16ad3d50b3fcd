use gudgeon_domain::{DomainError, RuleAction};
use std::path::Path;

/// A single normalized entry parsed out of a list file.
pub struct ParsedEntry {
    pub domain: String,
}

/// Accepts plain domain-per-line lists and `/etc/hosts`-style lists
/// (`0.0.0.0 ads.example`). Comments (`#`) and blank lines are skipped.
pub fn parse_list_line(line: &str) -> Option<ParsedEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() >= 2 {
        let addr = parts[0];
        let domain = parts[1];
        let is_hosts_addr = matches!(addr, "0.0.0.0" | "127.0.0.1" | "::" | "::1");
        if is_hosts_addr {
            if matches!(domain, "localhost" | "broadcasthost" | "ip6-localhost" | "ip6-loopback") {
                return None;
            }
            return Some(ParsedEntry {
                domain: domain.to_ascii_lowercase(),
            });
        }
    }

    if parts.len() == 1 {
        return Some(ParsedEntry {
            domain: parts[0].to_ascii_lowercase(),
        });
    }

    None
}

pub fn parse_list_text(text: &str) -> Vec<ParsedEntry> {
    text.lines().filter_map(parse_list_line).collect()
}

pub fn load_list_file(path: &Path, action: RuleAction) -> Result<Vec<(String, RuleAction)>, DomainError> {
    let text = std::fs::read_to_string(path).map_err(|e| DomainError::ListLoad {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_list_text(&text)
        .into_iter()
        .map(|e| (e.domain, action))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_domain_list() {
        let entries = parse_list_text("ads.example\n# comment\n\ntracker.example\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].domain, "ads.example");
    }

    #[test]
    fn parses_hosts_style_list() {
        let entries = parse_list_text("0.0.0.0 ads.example\n127.0.0.1 localhost\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].domain, "ads.example");
    }
}
