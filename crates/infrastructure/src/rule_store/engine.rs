use super::backend::Backend;
use super::decision_cache::{decision_l0_clear, decision_l0_get, decision_l0_set, DecisionCache};
use super::index::{GroupIndex, RuleIndex};
use super::list_loader::load_list_file;
use super::sqlite_loader::load_rules;
use super::suffix_trie::SuffixTrie;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use gudgeon_application::ports::{BlockSource, RuleStore};
use gudgeon_domain::{Config, DomainError, RuleStoreBackend};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Compiles allow/block lists (and, for sqlite-backed variants, a sqlite
/// `rules` table) into a per-group [`RuleIndex`] and answers `check()`
/// queries against it through a two-level decision cache, mirroring the
/// block-filter engine this was adapted from: L0 is a thread-local LRU, L1
/// is a shared map, and only a cache miss on both touches the compiled
/// index.
pub struct RuleStoreEngine {
    index: ArcSwap<RuleIndex>,
    decision_cache: DecisionCache,
    config: Config,
    pool: Option<SqlitePool>,
}

impl RuleStoreEngine {
    pub async fn new(config: Config, pool: Option<SqlitePool>) -> Result<Self, DomainError> {
        let index = compile_index(&config, pool.as_ref()).await?;
        info!(
            blocked_domains = index.total_blocked_domains,
            "rule store compiled"
        );
        Ok(Self {
            index: ArcSwap::from_pointee(index),
            decision_cache: DecisionCache::new(),
            config,
            pool,
        })
    }
}

#[async_trait]
impl RuleStore for RuleStoreEngine {
    #[inline]
    fn check(&self, domain: &str, groups: &[String]) -> Option<BlockSource> {
        let group_key = groups.join(",");

        if let Some(cached) = decision_l0_get(domain, &group_key) {
            return cached.map(|managed| {
                if managed {
                    BlockSource::ManagedDomain
                } else {
                    BlockSource::Blocklist
                }
            });
        }

        if let Some(blocked) = self.decision_cache.get(domain, &group_key) {
            decision_l0_set(domain, &group_key, Some(blocked));
            return blocked.then_some(BlockSource::Blocklist);
        }

        let guard = self.index.load();
        let decision = guard.check_any(domain, groups);

        let blocked = decision.is_some();
        self.decision_cache.set(domain, &group_key, blocked);
        decision_l0_set(
            domain,
            &group_key,
            decision.map(|s| matches!(s, BlockSource::ManagedDomain)),
        );

        decision
    }

    async fn reload(&self) -> Result<usize, DomainError> {
        info!("rule store reload started");
        let new_index = compile_index(&self.config, self.pool.as_ref())
            .await
            .map_err(|e| {
                warn!(error = %e, "rule store reload failed");
                e
            })?;
        let total = new_index.total_blocked_domains;
        self.index.store(Arc::new(new_index));
        self.decision_cache.clear();
        decision_l0_clear();
        info!(blocked_domains = total, "rule store reload completed");
        Ok(total)
    }
}

async fn compile_index(config: &Config, pool: Option<&SqlitePool>) -> Result<RuleIndex, DomainError> {
    let mut allow_by_group: HashMap<String, Vec<String>> = HashMap::new();
    let mut block_by_group: HashMap<String, Vec<String>> = HashMap::new();

    for group in &config.groups {
        allow_by_group.entry(group.name.clone()).or_default();
        block_by_group.entry(group.name.clone()).or_default();
    }

    for list in &config.lists {
        let entries = load_list_file(std::path::Path::new(&list.path), list.action.into())?;
        for group in &config.groups {
            if !list_applies(&list.groups, &group.name) {
                continue;
            }
            let target = match list.action {
                gudgeon_domain::ListActionConfig::Allow => allow_by_group.get_mut(&group.name),
                gudgeon_domain::ListActionConfig::Block => block_by_group.get_mut(&group.name),
            };
            if let Some(target) = target {
                target.extend(entries.iter().map(|(d, _)| d.clone()));
            }
        }
    }

    let backend_kind: RuleStoreBackend = config.rule_store.backend.into();
    let uses_sqlite = matches!(
        backend_kind,
        RuleStoreBackend::Sqlite | RuleStoreBackend::BloomSqlite | RuleStoreBackend::HashSqlite
    );

    if uses_sqlite {
        if let Some(pool) = pool {
            for rule in load_rules(pool).await? {
                let target = match rule.action.as_str() {
                    "allow" => allow_by_group.get_mut(&rule.group),
                    _ => block_by_group.get_mut(&rule.group),
                };
                if let Some(target) = target {
                    target.push(rule.domain);
                }
            }
        } else {
            warn!("sqlite-backed rule store configured without a sqlite pool; sqlite rules skipped");
        }
    }

    let mut groups = HashMap::new();
    let mut total_blocked_domains = 0usize;

    for group in &config.groups {
        let allow_domains = allow_by_group.remove(&group.name).unwrap_or_default();
        let block_domains = block_by_group.remove(&group.name).unwrap_or_default();
        total_blocked_domains += block_domains.len();

        let mut allow_trie = SuffixTrie::new();
        for d in &allow_domains {
            allow_trie.insert(d);
        }

        let capacity = block_domains.len();
        let backend = match backend_kind {
            RuleStoreBackend::Memory => Backend::memory(block_domains),
            RuleStoreBackend::Hash32 => Backend::hash32(block_domains),
            RuleStoreBackend::Hash64 => Backend::hash64(block_domains),
            RuleStoreBackend::Bloom => Backend::bloom(block_domains, capacity),
            RuleStoreBackend::Sqlite => Backend::hash_sqlite(block_domains),
            RuleStoreBackend::BloomSqlite => Backend::bloom_sqlite(block_domains, capacity),
            RuleStoreBackend::HashSqlite => Backend::hash_sqlite(block_domains),
        };

        groups.insert(
            group.name.clone(),
            GroupIndex::new(allow_trie, backend, uses_sqlite),
        );
    }

    Ok(RuleIndex {
        groups,
        total_blocked_domains,
    })
}

fn list_applies(list_groups: &[String], group: &str) -> bool {
    list_groups.is_empty() || list_groups.iter().any(|g| g == group)
}
