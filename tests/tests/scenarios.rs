//! End-to-end scenarios exercising the full query pipeline (rule store,
//! cache, resolver graph) through the `Engine` use case, the way a real
//! query would flow from the wire server down to an upstream.

use async_trait::async_trait;
use gudgeon_application::Engine;
use gudgeon_domain::{
    BalanceStrategy, BlockResponse, Config, Consumer, DomainError, Group, IpMatch, ListActionConfig,
    Question, RecordData, RecordType, ResolverDef, Response, ResponseCode, ResourceRecord,
};
use gudgeon_infrastructure::{InMemoryCache, ResolverGraph, RuleStoreEngine, SourceAdapter};
use std::collections::HashMap;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
const LOCAL_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));

/// Always answers with a fixed A record, or fails, depending on how it is
/// constructed. Stands in for a real upstream without touching the network.
struct StubSource {
    answer: Option<Ipv4Addr>,
    ttl: u32,
    calls: Arc<AtomicUsize>,
}

impl StubSource {
    fn ok(ip: Ipv4Addr) -> Self {
        Self {
            answer: Some(ip),
            ttl: 300,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn ok_with_ttl(ip: Ipv4Addr, ttl: u32, calls: Arc<AtomicUsize>) -> Self {
        Self {
            answer: Some(ip),
            ttl,
            calls,
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            ttl: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    async fn resolve(&self, question: &Question) -> Result<Response, DomainError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.answer {
            Some(ip) => Ok(Response::no_error(vec![ResourceRecord::new(
                question.normalized_name(),
                self.ttl,
                RecordData::A(ip),
            )])),
            None => Err(DomainError::Transport("connection refused".into())),
        }
    }
}

fn write_list(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

fn base_config() -> Config {
    let mut config = Config::default();
    config.groups.push(gudgeon_domain::config::GroupConfig {
        name: "default".into(),
        block_response: "NXDOMAIN".into(),
        resolvers: Vec::new(),
    });
    config
}

async fn build_engine(
    config: Config,
    resolver_defs: Vec<ResolverDef>,
    sources: HashMap<String, Arc<dyn SourceAdapter>>,
    groups: Vec<Group>,
) -> Engine {
    let rule_store = Arc::new(RuleStoreEngine::new(config.clone(), None).await.unwrap());
    let resolver = Arc::new(ResolverGraph::new(resolver_defs, sources));
    let cache = Arc::new(InMemoryCache::new(100));
    let consumers = vec![Consumer::new(
        "test-client",
        IpMatch::Exact(CLIENT_IP),
        vec!["default".into()],
    )];
    Engine::new(rule_store, resolver, cache, consumers, groups, &config)
}

/// Named `default` so it's picked up by every test group's
/// `effective_resolvers()` fallback without each test wiring `resolvers`
/// explicitly.
fn catch_all_resolver(sources: Vec<&str>) -> ResolverDef {
    ResolverDef {
        name: "default".into(),
        domains: vec!["*".into()],
        search: vec![],
        balance: BalanceStrategy::Sequential,
        sources: sources.into_iter().map(str::to_string).collect(),
    }
}

#[tokio::test]
async fn s1_block_by_exact_rule_returns_nxdomain() {
    let blocklist = write_list(&["ads.example"]);
    let mut config = base_config();
    config.lists.push(gudgeon_domain::config::ListConfig {
        path: blocklist.path().display().to_string(),
        action: ListActionConfig::Block,
        groups: vec![],
    });

    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();
    sources.insert("upstream".into(), Arc::new(StubSource::ok(Ipv4Addr::new(1, 2, 3, 4))));

    let engine = build_engine(
        config,
        vec![catch_all_resolver(vec!["upstream"])],
        sources,
        vec![Group::new("default")],
    )
    .await;

    let question = Question::new("ads.example", RecordType::A);
    let (response, _resolution) = engine.handle(&question, CLIENT_IP, LOCAL_IP).await;

    assert_eq!(response.code, ResponseCode::NxDomain);
    assert!(response.answers.is_empty());
}

#[tokio::test]
async fn s2_allow_list_overrides_block_list() {
    let blocklist = write_list(&["ads.example"]);
    let allowlist = write_list(&["ads.example"]);
    let mut config = base_config();
    config.lists.push(gudgeon_domain::config::ListConfig {
        path: blocklist.path().display().to_string(),
        action: ListActionConfig::Block,
        groups: vec![],
    });
    config.lists.push(gudgeon_domain::config::ListConfig {
        path: allowlist.path().display().to_string(),
        action: ListActionConfig::Allow,
        groups: vec![],
    });

    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();
    sources.insert("upstream".into(), Arc::new(StubSource::ok(Ipv4Addr::new(1, 2, 3, 4))));

    let engine = build_engine(
        config,
        vec![catch_all_resolver(vec!["upstream"])],
        sources,
        vec![Group::new("default")],
    )
    .await;

    let question = Question::new("ads.example", RecordType::A);
    let (response, _resolution) = engine.handle(&question, CLIENT_IP, LOCAL_IP).await;

    assert_eq!(response.code, ResponseCode::NoError);
    assert_eq!(response.answers.len(), 1);
    assert_eq!(response.answers[0].data, RecordData::A(Ipv4Addr::new(1, 2, 3, 4)));
}

#[tokio::test]
async fn s3_wildcard_blocks_subdomains_but_allows_bare_suffix() {
    let blocklist = write_list(&["*.tracker.example"]);
    let mut config = base_config();
    config.lists.push(gudgeon_domain::config::ListConfig {
        path: blocklist.path().display().to_string(),
        action: ListActionConfig::Block,
        groups: vec![],
    });

    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();
    sources.insert("upstream".into(), Arc::new(StubSource::ok(Ipv4Addr::new(5, 6, 7, 8))));

    let engine = build_engine(
        config,
        vec![catch_all_resolver(vec!["upstream"])],
        sources,
        vec![Group::new("default")],
    )
    .await;

    let (blocked, _) = engine
        .handle(&Question::new("pixel.tracker.example", RecordType::A), CLIENT_IP, LOCAL_IP)
        .await;
    assert_eq!(blocked.code, ResponseCode::NxDomain);

    let (allowed, _) = engine
        .handle(&Question::new("tracker.example", RecordType::A), CLIENT_IP, LOCAL_IP)
        .await;
    assert_eq!(allowed.code, ResponseCode::NoError);
    assert_eq!(allowed.answers[0].data, RecordData::A(Ipv4Addr::new(5, 6, 7, 8)));
}

#[tokio::test]
async fn s4_cache_hit_decrements_remaining_ttl_without_requerying() {
    let config = base_config();
    let calls = Arc::new(AtomicUsize::new(0));
    let stub = StubSource::ok_with_ttl(Ipv4Addr::new(9, 9, 9, 9), 2, calls.clone());

    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();
    sources.insert("upstream".into(), Arc::new(stub));

    let engine = build_engine(
        config,
        vec![catch_all_resolver(vec!["upstream"])],
        sources,
        vec![Group::new("default")],
    )
    .await;

    let question = Question::new("cached.example", RecordType::A);

    let (first, _) = engine.handle(&question, CLIENT_IP, LOCAL_IP).await;
    assert_eq!(first.answers[0].ttl, 2);
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let (second, _) = engine.handle(&question, CLIENT_IP, LOCAL_IP).await;
    // Served from cache (resolver not called again) with a ttl that has
    // decremented by roughly the elapsed wall-clock time.
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert!(second.answers[0].ttl < first.answers[0].ttl);
}

#[tokio::test]
async fn s5_source_failover_falls_through_to_next_source() {
    let config = base_config();

    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();
    sources.insert("unreachable".into(), Arc::new(StubSource::failing()));
    sources.insert(
        "8.8.8.8:53".into(),
        Arc::new(StubSource::ok(Ipv4Addr::new(8, 8, 8, 8))),
    );

    let engine = build_engine(
        config,
        vec![catch_all_resolver(vec!["unreachable", "8.8.8.8:53"])],
        sources,
        vec![Group::new("default")],
    )
    .await;

    let question = Question::new("example.com", RecordType::A);
    let (response, resolution) = engine.handle(&question, CLIENT_IP, LOCAL_IP).await;

    assert_eq!(response.code, ResponseCode::NoError);
    assert_eq!(response.answers[0].data, RecordData::A(Ipv4Addr::new(8, 8, 8, 8)));
    assert_eq!(resolution.source.as_deref(), Some("8.8.8.8:53"));
}

#[tokio::test]
async fn s6_endpoint_policy_answers_with_local_ip_and_zero_ttl() {
    let blocklist = write_list(&["ads.example"]);
    let mut config = base_config();
    config.groups[0].block_response = "ENDPOINT".into();
    config.lists.push(gudgeon_domain::config::ListConfig {
        path: blocklist.path().display().to_string(),
        action: ListActionConfig::Block,
        groups: vec![],
    });

    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();
    sources.insert("upstream".into(), Arc::new(StubSource::ok(Ipv4Addr::new(1, 2, 3, 4))));

    let groups: Vec<Group> = config
        .groups
        .iter()
        .map(|g| g.to_group())
        .collect::<Result<_, DomainError>>()
        .unwrap();

    let engine = build_engine(config, vec![catch_all_resolver(vec!["upstream"])], sources, groups).await;

    let (response, _resolution) = engine
        .handle(&Question::new("ads.example", RecordType::A), CLIENT_IP, LOCAL_IP)
        .await;

    assert_eq!(response.code, ResponseCode::NoError);
    assert_eq!(response.answers.len(), 1);
    assert_eq!(response.answers[0].data, RecordData::A(Ipv4Addr::new(192, 168, 1, 1)));
    assert_eq!(response.answers[0].ttl, 0);
}
