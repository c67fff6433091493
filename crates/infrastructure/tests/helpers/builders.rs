#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::RecordType;
use minke_dns_application::ports::UpstreamRegistry;
use minke_dns_domain::config::{CacheConfig, QueryStrategy};
use minke_dns_domain::{QueryContext, TransportKind, UpstreamHandle, UpstreamSpec};
use minke_dns_infrastructure::dns::router::BuiltinResolvers;
use minke_dns_infrastructure::dns::{
    wire, AnswerCache, AuthoritativeResolver, DnsRequestHandler, InMemoryMdnsHosts, LocalZone,
    MulticastBridge, NetworkAddressTranslator, QueryRouter,
};
use std::net::SocketAddr;
use std::sync::Arc;

pub struct TestServerBuilder {
    strategy: QueryStrategy,
    domain: String,
    cache: CacheConfig,
    translator: Option<Arc<NetworkAddressTranslator>>,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            strategy: QueryStrategy::Parallel,
            domain: String::new(),
            cache: CacheConfig::default(),
            translator: None,
        }
    }

    pub fn strategy(mut self, strategy: QueryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn translator(mut self, translator: Arc<NetworkAddressTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn build(self) -> TestServer {
        let zone = Arc::new(LocalZone::new(&self.domain));
        let authoritative = Arc::new(AuthoritativeResolver::new(Arc::clone(&zone)));
        let mdns_hosts = Arc::new(InMemoryMdnsHosts::new());
        let cache = Arc::new(AnswerCache::new(self.cache));

        let router = QueryRouter::new(
            self.strategy,
            BuiltinResolvers {
                authoritative: Arc::clone(&authoritative),
                multicast: Arc::new(MulticastBridge::new(mdns_hosts.clone())),
                cache: Arc::clone(&cache),
                translator: self.translator,
                zone: Arc::clone(&zone),
            },
        );

        TestServer {
            handler: DnsRequestHandler::new(Arc::clone(&router)),
            zone,
            authoritative,
            mdns_hosts,
            cache,
            router,
        }
    }
}

pub struct TestServer {
    pub zone: Arc<LocalZone>,
    pub authoritative: Arc<AuthoritativeResolver>,
    pub mdns_hosts: Arc<InMemoryMdnsHosts>,
    pub cache: Arc<AnswerCache>,
    pub router: Arc<QueryRouter>,
    pub handler: DnsRequestHandler,
}

impl TestServer {
    pub fn client() -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 50], 40000))
    }

    pub async fn add_upstream(
        &self,
        identity: &str,
        addr: SocketAddr,
        priority: i64,
    ) -> UpstreamHandle {
        self.add_upstream_spec(spec_for(identity, addr, priority)).await
    }

    pub async fn add_upstream_spec(&self, spec: UpstreamSpec) -> UpstreamHandle {
        self.router.add_dns_server(spec).await.unwrap()
    }

    pub async fn query(&self, name: &str, record_type: RecordType) -> Message {
        self.query_from(Self::client(), TransportKind::Udp, name, record_type)
            .await
    }

    pub async fn query_from(
        &self,
        origin: SocketAddr,
        transport: TransportKind,
        name: &str,
        record_type: RecordType,
    ) -> Message {
        let request = request(name, record_type);
        let bytes = wire::encode(&request).unwrap();
        let reply = self
            .handler
            .handle_packet(&bytes, QueryContext::new(origin, transport))
            .await;
        Message::from_vec(&reply).unwrap()
    }
}

pub fn spec_for(identity: &str, addr: SocketAddr, priority: i64) -> UpstreamSpec {
    let mut spec = UpstreamSpec::application(identity, addr.ip());
    spec.port = addr.port();
    spec.priority = priority;
    spec.timeout_ms = 1000;
    spec
}

pub fn request(name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new(0x4242, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(wire::parse_name(name).unwrap(), record_type));
    message
}
