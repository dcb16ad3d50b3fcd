//! The resolver graph: runs a single named [`ResolverDef`], retrying under
//! `search` suffixes on NXDOMAIN and dispatching across its `sources` per
//! its `balance` strategy. A `named` source recurses into another resolver
//! by name; a request-scoped visited set turns an accidental cycle into a
//! clean error instead of a stack overflow. *Which* resolver to try for a
//! given query is the engine's call (resolvers are scoped per group); this
//! graph only knows how to run one once it's been named.

use crate::source::SourceAdapter;
use async_trait::async_trait;
use dashmap::DashMap;
use gudgeon_application::ports::Resolver;
use gudgeon_domain::{BalanceStrategy, DomainError, Question, ResolverDef, Response};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct ResolverGraph {
    resolvers: Vec<ResolverDef>,
    sources: std::collections::HashMap<String, Arc<dyn SourceAdapter>>,
    round_robin_cursors: DashMap<String, AtomicUsize>,
}

impl ResolverGraph {
    pub fn new(
        resolvers: Vec<ResolverDef>,
        sources: std::collections::HashMap<String, Arc<dyn SourceAdapter>>,
    ) -> Self {
        Self {
            resolvers,
            sources,
            round_robin_cursors: DashMap::new(),
        }
    }

    fn find_resolver(&self, name: &str) -> Option<&ResolverDef> {
        self.resolvers.iter().find(|r| r.name == name)
    }

    fn ordered_sources<'a>(&self, resolver: &'a ResolverDef) -> Vec<&'a str> {
        let mut names: Vec<&str> = resolver.sources.iter().map(|s| s.as_str()).collect();
        if resolver.balance == BalanceStrategy::RoundRobin && !names.is_empty() {
            let cursor = self
                .round_robin_cursors
                .entry(resolver.name.clone())
                .or_insert_with(|| AtomicUsize::new(0));
            let start = cursor.fetch_add(1, Ordering::Relaxed) % names.len();
            names.rotate_left(start);
        }
        names
    }

    /// Candidate names to try, in order: the bare name first, then (only
    /// for a genuinely single-label name with no dot at all) the name under
    /// each configured search suffix.
    fn candidate_names(resolver: &ResolverDef, name: &str) -> Vec<String> {
        let mut candidates = vec![name.to_string()];
        if name.contains('.') {
            return candidates;
        }
        for suffix in &resolver.search {
            candidates.push(format!("{name}.{}", suffix.trim_matches('.')));
        }
        candidates
    }

    async fn resolve_via(
        &self,
        resolver: &ResolverDef,
        question: &Question,
        visited: &mut HashSet<String>,
    ) -> Result<(Response, String), DomainError> {
        if !visited.insert(resolver.name.clone()) {
            return Err(DomainError::ResolverCycle(resolver.name.clone()));
        }

        let original_name = question.normalized_name().to_string();
        let candidates = Self::candidate_names(resolver, &original_name);
        let source_names = self.ordered_sources(resolver);

        let mut last_err = DomainError::SourcesExhausted;
        for candidate in &candidates {
            let candidate_question = Question::new(candidate.clone(), question.record_type)
                .with_recursion_desired(question.recursion_desired);

            for source_name in &source_names {
                let result = if let Some(source) = self.sources.get(*source_name) {
                    source
                        .resolve(&candidate_question)
                        .await
                        .map(|r| (r, (*source_name).to_string()))
                } else if let Some(next) = self.find_resolver(source_name) {
                    Box::pin(self.resolve_via(next, &candidate_question, visited)).await
                } else {
                    debug!(source = source_name, "resolver references unknown source");
                    continue;
                };

                match result {
                    Ok((mut response, source)) => {
                        if candidate != &original_name {
                            rewrite_owner_names(&mut response, candidate, &original_name);
                        }
                        return Ok((response, source));
                    }
                    Err(DomainError::NxDomain) => {
                        last_err = DomainError::NxDomain;
                        continue;
                    }
                    Err(e) => {
                        last_err = e;
                        continue;
                    }
                }
            }
        }

        Err(last_err)
    }
}

/// Rewrites every answer owner name equal to the queried (suffixed)
/// candidate back to the name the client actually asked about, leaving any
/// CNAME target (or other unrelated owner) untouched so the chain still
/// reads correctly.
fn rewrite_owner_names(response: &mut Response, candidate: &str, original: &str) {
    for answer in &mut response.answers {
        if answer.name.eq_ignore_ascii_case(candidate) {
            answer.name = original.to_string();
        }
    }
}

#[async_trait]
impl Resolver for ResolverGraph {
    async fn resolve_named(
        &self,
        resolver_name: &str,
        question: &Question,
    ) -> Result<(Response, String), DomainError> {
        let resolver = self
            .find_resolver(resolver_name)
            .ok_or_else(|| DomainError::ResolverNotFound(resolver_name.to_string()))?;

        if !resolver.handles(question.normalized_name()) {
            return Err(DomainError::ResolverSkipped(resolver_name.to_string()));
        }

        let mut visited = HashSet::new();
        self.resolve_via(resolver, question, &mut visited).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_names_suffixes_only_single_label_names() {
        let resolver = ResolverDef {
            name: "r".into(),
            domains: vec![],
            search: vec!["lan".into()],
            balance: BalanceStrategy::Sequential,
            sources: vec![],
        };

        assert_eq!(
            ResolverGraph::candidate_names(&resolver, "printer"),
            vec!["printer".to_string(), "printer.lan".to_string()]
        );
        assert_eq!(
            ResolverGraph::candidate_names(&resolver, "www.example.com"),
            vec!["www.example.com".to_string()]
        );
    }
}
