/// Which rule check produced the eventual answer, carried alongside the
/// response for logging and the query log (out of scope here, but the hook
/// point matches spec's `resolutionResult`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleMatch {
    #[default]
    None,
    Allow,
    Block,
}

/// Metadata describing how an answer was produced: which rule matched, and
/// which resolver/source ultimately answered (if the query reached the
/// resolver graph at all).
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    pub matched: RuleMatch,
    pub resolver: Option<String>,
    pub source: Option<String>,
}

impl ResolutionResult {
    pub fn blocked() -> Self {
        Self {
            matched: RuleMatch::Block,
            ..Self::default()
        }
    }

    pub fn resolved(resolver: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            matched: RuleMatch::None,
            resolver: Some(resolver.into()),
            source: Some(source.into()),
        }
    }
}
