use crate::ports::{Cache, Resolver, RuleStore};
use gudgeon_domain::{
    classify, BlockResponse, CacheKey, Config, Consumer, DomainError, Group, Question, RecordData,
    RecordType, ResolutionResult, Response, ResourceRecord, DEFAULT_GROUP,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifies a client, checks rules, consults the cache, and otherwise
/// dispatches to the resolver graph — the one request path every DNS query
/// goes through. Rule checks always happen before the cache check, and a
/// blocked domain is never stored in the cache, so a later allowlist reload
/// takes effect immediately rather than serving a stale blocked verdict.
pub struct Engine {
    rule_store: Arc<dyn RuleStore>,
    resolver: Arc<dyn Resolver>,
    cache: Arc<dyn Cache>,
    consumers: Vec<Consumer>,
    groups: HashMap<String, Group>,
    cache_min_ttl: u32,
    cache_max_ttl: u32,
}

impl Engine {
    pub fn new(
        rule_store: Arc<dyn RuleStore>,
        resolver: Arc<dyn Resolver>,
        cache: Arc<dyn Cache>,
        consumers: Vec<Consumer>,
        groups: Vec<Group>,
        config: &Config,
    ) -> Self {
        Self {
            rule_store,
            resolver,
            cache,
            consumers,
            groups: groups.into_iter().map(|g| (g.name.clone(), g)).collect(),
            cache_min_ttl: config.cache.global_min_ttl,
            cache_max_ttl: config.cache.global_max_ttl,
        }
    }

    /// The full ordered group list for a client: the matched consumer's
    /// `groups` in declaration order, with `default` appended if it isn't
    /// already one of them (or as the sole entry, if no consumer matched).
    fn groups_for(&self, client_ip: IpAddr) -> Vec<String> {
        let mut groups = classify(&self.consumers, client_ip)
            .map(|c| c.groups.clone())
            .unwrap_or_default();
        if !groups.iter().any(|g| g == DEFAULT_GROUP) {
            groups.push(DEFAULT_GROUP.to_string());
        }
        groups
    }

    fn block_response_for(&self, groups: &[String]) -> BlockResponse {
        groups
            .iter()
            .find_map(|g| self.groups.get(g))
            .map(|g| g.block_response)
            .unwrap_or_default()
    }

    pub async fn handle(
        &self,
        question: &Question,
        client_ip: IpAddr,
        local_ip: IpAddr,
    ) -> (Response, ResolutionResult) {
        let name = question.normalized_name();
        let consumer = classify(&self.consumers, client_ip);

        if consumer.map(|c| c.block).unwrap_or(false) {
            debug!(domain = %name, client = %client_ip, "query blocked by consumer flag");
            let block_response = self
                .groups
                .get(DEFAULT_GROUP)
                .map(|g| g.block_response)
                .unwrap_or_default();
            return (
                blocked_response(question, block_response, local_ip),
                ResolutionResult::blocked(),
            );
        }

        let groups = self.groups_for(client_ip);

        if let Some(source) = self.rule_store.check(name, &groups) {
            debug!(domain = %name, ?groups, ?source, "query blocked by rule store");
            let block_response = self.block_response_for(&groups);
            return (
                blocked_response(question, block_response, local_ip),
                ResolutionResult::blocked(),
            );
        }

        let key = CacheKey::new(name, question.record_type, question.qclass);

        if let Some(cached) = self.cache.get_any(&groups, &key) {
            debug!(domain = %name, ?groups, "cache hit");
            return (cached, ResolutionResult::default());
        }

        let mut last_err = DomainError::SourcesExhausted;
        for group in &groups {
            let fallback;
            let resolver_names: Vec<&str> = match self.groups.get(group) {
                Some(g) => g.effective_resolvers(),
                None => {
                    fallback = gudgeon_domain::DEFAULT_RESOLVER;
                    vec![fallback]
                }
            };

            for resolver_name in resolver_names {
                match self.resolver.resolve_named(resolver_name, question).await {
                    Ok((response, source)) => {
                        self.maybe_cache(group, key.clone(), &response);
                        return (response, ResolutionResult::resolved(resolver_name, source));
                    }
                    Err(DomainError::ResolverSkipped(_)) | Err(DomainError::ResolverNotFound(_)) => {
                        continue;
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

        let response = match last_err {
            DomainError::NxDomain => {
                debug!(domain = %name, "resolver returned nxdomain");
                Response::nxdomain()
            }
            e => {
                warn!(domain = %name, error = %e, "resolver chain exhausted");
                Response::servfail()
            }
        };
        (response, ResolutionResult::default())
    }

    fn maybe_cache(&self, group: &str, key: CacheKey, response: &Response) {
        let ttl = match response.min_ttl() {
            Some(ttl) => ttl.clamp(self.cache_min_ttl, self.cache_max_ttl),
            None => 0,
        };
        if ttl > 0 {
            self.cache.put(group, key, response.clone(), ttl);
        }
    }
}

/// Synthesizes the reply for a query a group's rules blocked, per its
/// `blockResponse` policy. `ENDPOINT` and a literal IP both answer with the
/// address if its family matches the question's record type, and with an
/// empty NOERROR otherwise (there is no sensible A answer to an AAAA query).
fn blocked_response(question: &Question, policy: BlockResponse, local_ip: IpAddr) -> Response {
    let addr = match policy {
        BlockResponse::NxDomain => return Response::nxdomain(),
        BlockResponse::Endpoint => local_ip,
        BlockResponse::Ip(addr) => addr,
    };

    let data = match (question.record_type, addr) {
        (RecordType::A, IpAddr::V4(v4)) => Some(RecordData::A(v4)),
        (RecordType::Aaaa, IpAddr::V6(v6)) => Some(RecordData::Aaaa(v6)),
        _ => None,
    };

    match data {
        Some(data) => Response::no_error(vec![ResourceRecord::new(question.normalized_name(), 0, data)]),
        None => Response::no_error(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gudgeon_domain::{IpMatch, RecordType, RuleMatch};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubRuleStore {
        blocked: Vec<&'static str>,
    }
    #[async_trait::async_trait]
    impl RuleStore for StubRuleStore {
        fn check(&self, domain: &str, _groups: &[String]) -> Option<crate::ports::BlockSource> {
            if self.blocked.contains(&domain) {
                Some(crate::ports::BlockSource::Blocklist)
            } else {
                None
            }
        }
        async fn reload(&self) -> Result<usize, DomainError> {
            Ok(0)
        }
    }

    struct StubResolver;
    #[async_trait::async_trait]
    impl Resolver for StubResolver {
        async fn resolve_named(
            &self,
            resolver_name: &str,
            question: &Question,
        ) -> Result<(Response, String), DomainError> {
            if question.name == "missing.example" {
                return Err(DomainError::NxDomain);
            }
            Ok((
                Response::no_error(vec![gudgeon_domain::ResourceRecord::new(
                    &question.name,
                    300,
                    gudgeon_domain::RecordData::A("1.2.3.4".parse().unwrap()),
                )]),
                format!("{resolver_name}/stub"),
            ))
        }
    }

    struct StubCache {
        store: Mutex<HashMap<(String, String), Response>>,
    }
    impl Cache for StubCache {
        fn get(&self, group: &str, key: &CacheKey) -> Option<Response> {
            self.store
                .lock()
                .unwrap()
                .get(&(group.to_string(), key.name.to_string()))
                .cloned()
        }
        fn put(&self, group: &str, key: CacheKey, response: Response, _ttl: u32) {
            self.store
                .lock()
                .unwrap()
                .insert((group.to_string(), key.name.to_string()), response);
        }
    }

    const LOCAL_IP: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(192, 168, 1, 1));

    fn engine(blocked: Vec<&'static str>) -> Engine {
        engine_with_group(blocked, Group::new("kids"))
    }

    fn engine_with_group(blocked: Vec<&'static str>, group: Group) -> Engine {
        Engine::new(
            Arc::new(StubRuleStore { blocked }),
            Arc::new(StubResolver),
            Arc::new(StubCache {
                store: Mutex::new(HashMap::new()),
            }),
            vec![Consumer::new(
                "laptop",
                IpMatch::Exact("10.0.0.5".parse().unwrap()),
                vec!["kids".into()],
            )],
            vec![group],
            &Config::default(),
        )
    }

    #[tokio::test]
    async fn blocked_domain_is_nxdomain_by_default_and_not_cached() {
        let engine = engine(vec!["ads.example"]);
        let q = Question::new("ads.example", RecordType::A);
        let (r, resolution) = engine.handle(&q, "10.0.0.5".parse().unwrap(), LOCAL_IP).await;
        assert_eq!(r.code, gudgeon_domain::ResponseCode::NxDomain);
        assert_eq!(resolution.matched, RuleMatch::Block);
    }

    #[tokio::test]
    async fn blocked_domain_with_endpoint_policy_answers_with_local_ip() {
        let engine = engine_with_group(
            vec!["ads.example"],
            Group::with_block_response("kids", BlockResponse::Endpoint),
        );
        let q = Question::new("ads.example", RecordType::A);
        let (r, _) = engine.handle(&q, "10.0.0.5".parse().unwrap(), LOCAL_IP).await;
        assert_eq!(r.code, gudgeon_domain::ResponseCode::NoError);
        assert_eq!(r.answers.len(), 1);
        assert_eq!(r.answers[0].data, RecordData::A(std::net::Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(r.answers[0].ttl, 0);
    }

    #[tokio::test]
    async fn resolved_answer_is_served_and_then_cached() {
        let engine = engine(vec![]);
        let q = Question::new("example.com", RecordType::A);
        let (r, resolution) = engine.handle(&q, "10.0.0.5".parse().unwrap(), LOCAL_IP).await;
        assert_eq!(r.code, gudgeon_domain::ResponseCode::NoError);
        assert_eq!(r.answers.len(), 1);
        assert_eq!(resolution.source.as_deref(), Some("default/stub"));
    }

    #[tokio::test]
    async fn nxdomain_maps_to_nxdomain_response() {
        let engine = engine(vec![]);
        let q = Question::new("missing.example", RecordType::A);
        let (r, _) = engine.handle(&q, "10.0.0.5".parse().unwrap(), LOCAL_IP).await;
        assert_eq!(r.code, gudgeon_domain::ResponseCode::NxDomain);
    }

    #[tokio::test]
    async fn consumer_block_flag_short_circuits_before_rule_store() {
        let mut engine = engine(vec![]);
        engine.consumers[0].block = true;
        let q = Question::new("anything.example", RecordType::A);
        let (r, resolution) = engine.handle(&q, "10.0.0.5".parse().unwrap(), LOCAL_IP).await;
        assert_eq!(r.code, gudgeon_domain::ResponseCode::NxDomain);
        assert_eq!(resolution.matched, RuleMatch::Block);
    }
}
