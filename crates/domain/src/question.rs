use crate::record::RecordType;
use std::net::IpAddr;

/// A normalized query, as lifted from the wire request. `name` is always
/// lower-cased and stripped of any trailing root dot before it reaches the
/// rule store, resolver or cache.
#[derive(Debug, Clone)]
pub struct Question {
    pub name: String,
    pub record_type: RecordType,
    pub qclass: u16,
    /// The RD bit of the inbound client request. A DNS source refuses to
    /// forward a query with this unset rather than silently recursing on
    /// the client's behalf.
    pub recursion_desired: bool,
}

impl Question {
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: normalize_name(&name.into()),
            record_type,
            qclass: 1, // IN
            recursion_desired: true,
        }
    }

    pub fn normalized_name(&self) -> &str {
        &self.name
    }

    pub fn with_recursion_desired(mut self, recursion_desired: bool) -> Self {
        self.recursion_desired = recursion_desired;
        self
    }
}

/// Lower-cases and trims the trailing root label, matching how every other
/// module (rule store, cache key, resolver `domains` glob) expects a name to
/// already look by the time it reaches them.
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// The inbound query plus the client address it arrived from, used by the
/// engine to classify a consumer/group before anything else happens.
#[derive(Debug, Clone)]
pub struct Request {
    pub question: Question,
    pub client_ip: IpAddr,
}

impl Request {
    pub fn new(name: impl Into<String>, record_type: RecordType, client_ip: IpAddr) -> Self {
        Self {
            question: Question::new(name, record_type),
            client_ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_root_dot_and_lowercases() {
        assert_eq!(normalize_name("Example.COM."), "example.com");
        assert_eq!(normalize_name("example.com"), "example.com");
    }
}
