use clap::Parser;
use gudgeon_application::Engine;
use gudgeon_domain::{CliOverrides, Config, Consumer, DomainError, Group, ResolverDef, SourceSpec};
use gudgeon_infrastructure::{
    DnsServerHandler, DnsSource, HostFileSource, InMemoryCache, ResolverGraph, RuleStoreEngine,
    SourceAdapter, ZoneFileSource,
};
use hickory_server::ServerFuture;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gudgeon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Gudgeon - recursive filtering DNS proxy")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = Config::load(cli.config.as_deref(), cli_overrides)?;
    config.validate()?;

    let log_level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_max_level(log_level)
        .with_ansi(true)
        .init();

    info!("Starting Gudgeon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_file = cli.config.as_deref().unwrap_or("default"),
        dns_port = config.server.dns_port,
        bind = %config.server.bind_address,
        groups = config.groups.len(),
        sources = config.sources.len(),
        resolvers = config.resolvers.len(),
        "configuration loaded"
    );

    let sqlite_pool = build_sqlite_pool(&config).await?;

    let rule_store = Arc::new(RuleStoreEngine::new(config.clone(), sqlite_pool).await?);

    let groups: Vec<Group> = config
        .groups
        .iter()
        .map(|g| g.to_group())
        .collect::<Result<_, DomainError>>()?;

    let consumers: Vec<Consumer> = config
        .consumers
        .iter()
        .map(|c| c.to_consumer())
        .collect::<Result<_, DomainError>>()?;

    let sources = build_sources(&config)?;

    let resolver_defs: Vec<ResolverDef> = config
        .resolvers
        .iter()
        .map(|r| r.to_resolver_def())
        .collect();

    let resolver = Arc::new(ResolverGraph::new(resolver_defs, sources));
    let cache = Arc::new(InMemoryCache::new(config.cache.capacity_per_group));

    let engine = Arc::new(Engine::new(
        rule_store,
        resolver,
        cache,
        consumers,
        groups,
        &config,
    ));

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.dns_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;

    let handler = DnsServerHandler::new(engine, bind_addr.ip());

    start_dns_server(bind_addr, handler).await?;

    Ok(())
}

/// Builds the sqlite pool backing the rule store when a sqlite-flavored
/// backend is configured. Other backends never touch sqlite at all.
async fn build_sqlite_pool(config: &Config) -> anyhow::Result<Option<sqlx::SqlitePool>> {
    use gudgeon_domain::RuleStoreBackend;
    let backend: RuleStoreBackend = config.rule_store.backend.into();
    let needs_sqlite = matches!(
        backend,
        RuleStoreBackend::Sqlite | RuleStoreBackend::BloomSqlite | RuleStoreBackend::HashSqlite
    );
    if !needs_sqlite {
        return Ok(None);
    }

    let path = config
        .rule_store
        .sqlite_path
        .as_deref()
        .unwrap_or("gudgeon.sqlite3");
    info!(path, "opening sqlite rule store");

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite:{path}?mode=rwc"))
        .await?;
    Ok(Some(pool))
}

/// Builds every leaf source adapter named under `[sources.<name>]`. `named`
/// sources are skipped here; the resolver graph resolves those by looking
/// up another resolver's name directly.
fn build_sources(
    config: &Config,
) -> anyhow::Result<HashMap<String, Arc<dyn SourceAdapter>>> {
    let mut sources: HashMap<String, Arc<dyn SourceAdapter>> = HashMap::new();

    for source_config in &config.sources {
        let spec = source_config.kind.clone().into_spec()?;
        let adapter: Arc<dyn SourceAdapter> = match spec {
            SourceSpec::HostFile { path } => Arc::new(HostFileSource::load(Path::new(&path))?),
            SourceSpec::ZoneFile { path, origin } => {
                Arc::new(ZoneFileSource::load(Path::new(&path), &origin)?)
            }
            SourceSpec::Dns {
                upstreams,
                recursion_desired,
            } => Arc::new(DnsSource::new(
                upstreams,
                recursion_desired,
                gudgeon_domain::WorkerPoolConfig::default(),
            )),
            SourceSpec::Named { name } => {
                info!(resolver = name, "skipping named source, resolved via resolver graph");
                continue;
            }
        };
        sources.insert(source_config.name.clone(), adapter);
    }

    Ok(sources)
}

async fn start_dns_server(bind_addr: SocketAddr, handler: DnsServerHandler) -> anyhow::Result<()> {
    info!(bind_address = %bind_addr, "starting DNS server");

    let udp_socket = UdpSocket::bind(bind_addr).await?;
    info!(protocol = "UDP", "DNS server listening");

    let tcp_listener = TcpListener::bind(bind_addr).await?;
    info!(protocol = "TCP", "DNS server listening");

    let mut server = ServerFuture::new(handler);
    server.register_socket(udp_socket);
    server.register_listener(tcp_listener, std::time::Duration::from_secs(10));

    info!("DNS server ready to accept queries");

    server.block_until_done().await?;

    info!("server shutdown complete");
    Ok(())
}
