use crate::record::ResourceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    NxDomain,
    ServFail,
    Refused,
    FormErr,
    NotImp,
}

/// A protocol-agnostic answer: the set of resource records a source or
/// resolver produced for a question, plus the code it should be reported
/// under. This is what the cache stores and what gets rewritten onto the
/// wire.
#[derive(Debug, Clone)]
pub struct Response {
    pub code: ResponseCode,
    pub answers: Vec<ResourceRecord>,
    pub authoritative: bool,
}

impl Response {
    pub fn no_error(answers: Vec<ResourceRecord>) -> Self {
        Self {
            code: ResponseCode::NoError,
            answers,
            authoritative: false,
        }
    }

    pub fn nxdomain() -> Self {
        Self {
            code: ResponseCode::NxDomain,
            answers: Vec::new(),
            authoritative: false,
        }
    }

    pub fn servfail() -> Self {
        Self {
            code: ResponseCode::ServFail,
            answers: Vec::new(),
            authoritative: false,
        }
    }

    pub fn refused() -> Self {
        Self {
            code: ResponseCode::Refused,
            answers: Vec::new(),
            authoritative: false,
        }
    }

    /// The smallest TTL across the answer RRset, or `None` for an empty set.
    /// Used by the cache to compute a single storage TTL for the whole
    /// response (spec: clamp(minTTL-of-RRset, globalMin, globalMax)).
    pub fn min_ttl(&self) -> Option<u32> {
        self.answers.iter().map(|r| r.ttl).min()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
