#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Allow,
    Block,
}

/// A single allow/block entry, already normalized (lower-case, no trailing
/// dot) by the time it reaches a `RuleStore` backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub domain: String,
    pub action: RuleAction,
}

impl Rule {
    pub fn allow(domain: impl Into<String>) -> Self {
        Self {
            domain: crate::question::normalize_name(&domain.into()),
            action: RuleAction::Allow,
        }
    }

    pub fn block(domain: impl Into<String>) -> Self {
        Self {
            domain: crate::question::normalize_name(&domain.into()),
            action: RuleAction::Block,
        }
    }
}

/// A named source of rules: a file on disk, tagged with the action its
/// entries apply (some lists are block lists, some are allow lists) and the
/// groups it is scoped to. An empty `groups` means "all groups".
#[derive(Debug, Clone)]
pub struct List {
    pub path: String,
    pub action: RuleAction,
    pub groups: Vec<String>,
}

impl List {
    pub fn new(path: impl Into<String>, action: RuleAction) -> Self {
        Self {
            path: path.into(),
            action,
            groups: Vec::new(),
        }
    }

    pub fn applies_to(&self, group: &str) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| g == group)
    }
}

/// Which rule-store backend to compile a group's rules into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleStoreBackend {
    #[default]
    Memory,
    Hash32,
    Hash64,
    Bloom,
    Sqlite,
    /// bloom filter fast-path in front of a sqlite exact-match table.
    BloomSqlite,
    /// in-memory hash fast-path in front of a sqlite exact-match table.
    HashSqlite,
}
