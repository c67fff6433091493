use minke_dns_domain::Config;
use minke_dns_infrastructure::dns::router::BuiltinResolvers;
use minke_dns_infrastructure::dns::{
    AnswerCache, AuthoritativeResolver, DnsRequestHandler, InMemoryMdnsHosts, LocalZone,
    MulticastBridge, NetworkAddressTranslator, QueryRouter,
};
use minke_dns_infrastructure::repositories::JsonTranslationStore;
use minke_dns_infrastructure::system::{IpCommandBinder, StaticNetworkDiscovery};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct DnsServices {
    pub authoritative: Arc<AuthoritativeResolver>,
    #[allow(dead_code)]
    pub mdns_hosts: Arc<InMemoryMdnsHosts>,
    pub router: Arc<QueryRouter>,
    pub handler: Arc<DnsRequestHandler>,
    /// Feeds upstream ordering changes into the router.
    pub ordering: watch::Sender<Vec<String>>,
    background: Vec<JoinHandle<()>>,
}

impl DnsServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        info!(strategy = config.dns.strategy.as_str(), "Initializing DNS services");

        let zone = Arc::new(LocalZone::new(&config.dns.domain_name));
        let authoritative = Arc::new(AuthoritativeResolver::new(Arc::clone(&zone)));
        let mdns_hosts = Arc::new(InMemoryMdnsHosts::new());
        let cache = Arc::new(AnswerCache::new(config.dns.cache.clone()));

        let mut background = Vec::new();
        let translator = Self::setup_translator(config, &mut background).await?;

        let router = QueryRouter::new(
            config.dns.strategy,
            BuiltinResolvers {
                authoritative: Arc::clone(&authoritative),
                multicast: Arc::new(MulticastBridge::new(mdns_hosts.clone())),
                cache,
                translator,
                zone,
            },
        );

        let (ordering, ordering_rx) = watch::channel(Vec::new());
        background.push(router.watch_ordering(ordering_rx));

        Ok(Self {
            authoritative,
            mdns_hosts,
            handler: Arc::new(DnsRequestHandler::new(Arc::clone(&router))),
            router,
            ordering,
            background,
        })
    }

    async fn setup_translator(
        config: &Config,
        background: &mut Vec<JoinHandle<()>>,
    ) -> anyhow::Result<Option<Arc<NetworkAddressTranslator>>> {
        let settings = &config.translation;
        if !settings.enabled {
            info!("Address translation disabled");
            return Ok(None);
        }

        let translator = Arc::new(NetworkAddressTranslator::new(
            settings,
            Arc::new(StaticNetworkDiscovery::from_config(settings)?),
            Arc::new(IpCommandBinder::new(&settings.ip_command, &settings.device)),
            Arc::new(JsonTranslationStore::new(&settings.state_path)),
        ));

        // Translated upstreams fall back to direct queries when this fails.
        if let Err(e) = translator.start().await {
            warn!(error = %e, "Address translation unavailable");
            return Ok(None);
        }
        background.push(translator.spawn_idle_sweep());
        Ok(Some(translator))
    }

    pub fn shutdown(&self) {
        for task in &self.background {
            task.abort();
        }
    }
}
