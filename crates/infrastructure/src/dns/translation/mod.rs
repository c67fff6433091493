//! DNS network address translation.
//!
//! Each origin that queries an application resolver gets its own source
//! address on the DNS network, so the application sees distinguishable
//! clients. Mappings are bound on the DNS network device, persisted, and
//! reclaimed when idle or when the pool runs low.

mod pool;

pub use pool::AddressPool;

use crate::dns::upstream::UdpExchange;
use dashmap::DashMap;
use ipnetwork::Ipv4Network;
use lru::LruCache;
use minke_dns_application::ports::{
    InterfaceBinder, NetworkDiscovery, TranslationEntry, TranslationSnapshot, TranslationStore,
};
use minke_dns_domain::config::TranslationConfig;
use minke_dns_domain::DomainError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Source address and socket to use for one origin.
#[derive(Clone)]
pub struct Lease {
    pub mapped: Ipv4Addr,
    pub exchange: Arc<UdpExchange>,
}

struct Mapping {
    mapped: Ipv4Addr,
    exchange: Arc<UdpExchange>,
    last_used: Instant,
}

struct Tables {
    /// Keyed by original address, least recently used first.
    forward: LruCache<Ipv4Addr, Mapping>,
    pool: AddressPool,
    prefix: u8,
    fingerprint: String,
}

pub struct NetworkAddressTranslator {
    discovery: Arc<dyn NetworkDiscovery>,
    binder: Arc<dyn InterfaceBinder>,
    store: Arc<dyn TranslationStore>,
    idle_ttl: Duration,
    low_watermark: usize,
    high_watermark: usize,
    tables: Mutex<Option<Tables>>,
    /// Mapped address to original, readable without the table lock.
    backward: DashMap<Ipv4Addr, Ipv4Addr>,
}

impl NetworkAddressTranslator {
    pub fn new(
        config: &TranslationConfig,
        discovery: Arc<dyn NetworkDiscovery>,
        binder: Arc<dyn InterfaceBinder>,
        store: Arc<dyn TranslationStore>,
    ) -> Self {
        Self {
            discovery,
            binder,
            store,
            idle_ttl: Duration::from_secs(config.idle_ttl_secs),
            low_watermark: config.low_watermark,
            high_watermark: config.high_watermark,
            tables: Mutex::new(None),
            backward: DashMap::new(),
        }
    }

    /// Discover both networks, build the pool and restore persisted
    /// mappings when the DNS network is unchanged.
    pub async fn start(&self) -> Result<(), DomainError> {
        let dns = self.discovery.dns_network().await?;
        let home = self.discovery.home_network().await?;
        let fingerprint = fingerprint_of(dns);
        let pool = AddressPool::for_networks(dns, home);

        info!(
            dns_network = %fingerprint,
            home_network = %home,
            masked = pool.is_masked(),
            available = pool.available(),
            "Address translation starting"
        );

        let mut tables = Tables {
            forward: LruCache::unbounded(),
            pool,
            prefix: dns.prefix(),
            fingerprint,
        };

        match self.store.load().await {
            Ok(Some(snapshot)) if snapshot.fingerprint == tables.fingerprint => {
                self.restore(&mut tables, snapshot).await;
            }
            Ok(Some(snapshot)) => {
                info!(
                    previous = %snapshot.fingerprint,
                    current = %tables.fingerprint,
                    "DNS network changed, discarding saved translations"
                );
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load saved translations"),
        }

        let mut guard = self.tables.lock().await;
        *guard = Some(tables);
        self.persist(guard.as_ref()).await;
        Ok(())
    }

    async fn restore(&self, tables: &mut Tables, snapshot: TranslationSnapshot) {
        for entry in snapshot.mappings {
            if tables.forward.contains(&entry.original) || !tables.pool.claim(entry.mapped) {
                warn!(original = %entry.original, mapped = %entry.mapped, "Skipping saved translation");
                continue;
            }
            // The address usually survives a restart on the device.
            if let Err(e) = self.binder.bind(entry.mapped, tables.prefix).await {
                debug!(mapped = %entry.mapped, error = %e, "Rebind of saved translation failed");
            }
            match UdpExchange::bind(SocketAddr::from((entry.mapped, 0))).await {
                Ok(exchange) => {
                    tables.forward.put(
                        entry.original,
                        Mapping {
                            mapped: entry.mapped,
                            exchange: Arc::new(exchange),
                            last_used: Instant::now(),
                        },
                    );
                    self.backward.insert(entry.mapped, entry.original);
                }
                Err(e) => {
                    warn!(mapped = %entry.mapped, error = %e, "Saved translation unusable");
                    self.release_address(tables, entry.mapped);
                }
            }
        }
        info!(restored = tables.forward.len(), "Saved translations restored");
    }

    pub async fn is_started(&self) -> bool {
        self.tables.lock().await.is_some()
    }

    pub async fn mapping_count(&self) -> usize {
        self.tables
            .lock()
            .await
            .as_ref()
            .map_or(0, |t| t.forward.len())
    }

    pub async fn available(&self) -> usize {
        self.tables
            .lock()
            .await
            .as_ref()
            .map_or(0, |t| t.pool.available())
    }

    /// Original address behind a DNS-network address, if it is mapped.
    pub fn translate_dns_network_address(&self, mapped: Ipv4Addr) -> Option<Ipv4Addr> {
        self.backward.get(&mapped).map(|entry| *entry.value())
    }

    /// Lease for `origin`: reuse a live mapping, recycle an expired one,
    /// or bind a new address. `Ok(None)` when translation does not apply
    /// (not started, IPv6 origin, or no address for it).
    pub async fn allocate(&self, origin: IpAddr) -> Result<Option<Lease>, DomainError> {
        let IpAddr::V4(original) = origin else {
            return Ok(None);
        };

        let mut guard = self.tables.lock().await;
        let Some(tables) = guard.as_mut() else {
            return Ok(None);
        };

        let now = Instant::now();
        let recycle = match tables.forward.get_mut(&original) {
            Some(mapping) if now.duration_since(mapping.last_used) < self.idle_ttl => {
                mapping.last_used = now;
                return Ok(Some(Lease {
                    mapped: mapping.mapped,
                    exchange: Arc::clone(&mapping.exchange),
                }));
            }
            Some(mapping) => Some(mapping.mapped),
            None => None,
        };

        let lease = match recycle {
            Some(mapped) => self.recycle(tables, original, mapped).await?,
            None => match self.mint(tables, original).await? {
                Some(lease) => lease,
                None => return Ok(None),
            },
        };

        if tables.pool.available() < self.low_watermark {
            self.prune(tables, original).await;
        }
        self.persist(guard.as_ref()).await;
        Ok(Some(lease))
    }

    /// Replace the binding and socket of an expired mapping, keeping its address.
    async fn recycle(
        &self,
        tables: &mut Tables,
        original: Ipv4Addr,
        mapped: Ipv4Addr,
    ) -> Result<Lease, DomainError> {
        debug!(original = %original, mapped = %mapped, "Recycling expired translation");
        tables.forward.pop(&original);
        if let Err(e) = self.binder.unbind(mapped, tables.prefix).await {
            warn!(mapped = %mapped, error = %e, "Failed to unbind expired translation");
        }
        match self.bind_mapping(tables, original, mapped).await {
            Ok(lease) => Ok(lease),
            Err(e) => {
                self.backward.remove(&mapped);
                self.release_address(tables, mapped);
                Err(e)
            }
        }
    }

    async fn mint(
        &self,
        tables: &mut Tables,
        original: Ipv4Addr,
    ) -> Result<Option<Lease>, DomainError> {
        let mapped = match tables.pool.allocate(original) {
            Some(mapped) => mapped,
            None if tables.pool.is_masked() => return Ok(None),
            None => {
                // Exhausted: take over the least recently used mapping.
                match tables.forward.pop_lru() {
                    Some((previous, mapping)) => {
                        debug!(previous = %previous, mapped = %mapping.mapped, "Pool exhausted, reusing translation");
                        self.backward.remove(&mapping.mapped);
                        if let Err(e) = self.binder.unbind(mapping.mapped, tables.prefix).await {
                            warn!(mapped = %mapping.mapped, error = %e, "Failed to unbind translation");
                        }
                        mapping.mapped
                    }
                    None => return Ok(None),
                }
            }
        };

        match self.bind_mapping(tables, original, mapped).await {
            Ok(lease) => {
                info!(original = %original, mapped = %mapped, "Address translation created");
                Ok(Some(lease))
            }
            Err(e) => {
                self.release_address(tables, mapped);
                Err(e)
            }
        }
    }

    async fn bind_mapping(
        &self,
        tables: &mut Tables,
        original: Ipv4Addr,
        mapped: Ipv4Addr,
    ) -> Result<Lease, DomainError> {
        self.binder.bind(mapped, tables.prefix).await?;
        let exchange = match UdpExchange::bind(SocketAddr::from((mapped, 0))).await {
            Ok(exchange) => Arc::new(exchange),
            Err(e) => {
                if let Err(unbind) = self.binder.unbind(mapped, tables.prefix).await {
                    warn!(mapped = %mapped, error = %unbind, "Failed to unbind translation");
                }
                return Err(e);
            }
        };

        tables.forward.put(
            original,
            Mapping {
                mapped,
                exchange: Arc::clone(&exchange),
                last_used: Instant::now(),
            },
        );
        self.backward.insert(mapped, original);
        Ok(Lease { mapped, exchange })
    }

    /// Release least recently used mappings until the pool is back at the
    /// high watermark. The mapping for `keep` was just leased and stays.
    async fn prune(&self, tables: &mut Tables, keep: Ipv4Addr) {
        let mut pruned = 0usize;
        while tables.pool.available() < self.high_watermark {
            match tables.forward.peek_lru() {
                Some((original, _)) if *original != keep => {}
                _ => break,
            }
            let Some((original, mapping)) = tables.forward.pop_lru() else {
                break;
            };
            self.drop_mapping(tables, original, mapping).await;
            pruned += 1;
        }
        debug!(pruned, available = tables.pool.available(), "Translations pruned");
    }

    /// Reclaim every mapping unused for longer than the idle TTL.
    pub async fn sweep_idle(&self) -> usize {
        let mut guard = self.tables.lock().await;
        let Some(tables) = guard.as_mut() else {
            return 0;
        };

        let now = Instant::now();
        let mut swept = 0usize;
        while let Some((_, mapping)) = tables.forward.peek_lru() {
            if now.duration_since(mapping.last_used) < self.idle_ttl {
                break;
            }
            if let Some((original, mapping)) = tables.forward.pop_lru() {
                self.drop_mapping(tables, original, mapping).await;
                swept += 1;
            }
        }

        if swept > 0 {
            info!(swept, "Idle translations reclaimed");
            self.persist(guard.as_ref()).await;
        }
        swept
    }

    /// Run `sweep_idle` every idle TTL until the translator is dropped.
    pub fn spawn_idle_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.idle_ttl.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(translator) = weak.upgrade() else {
                    break;
                };
                translator.sweep_idle().await;
            }
        })
    }

    async fn drop_mapping(&self, tables: &mut Tables, original: Ipv4Addr, mapping: Mapping) {
        self.backward.remove(&mapping.mapped);
        if let Err(e) = self.binder.unbind(mapping.mapped, tables.prefix).await {
            warn!(mapped = %mapping.mapped, error = %e, "Failed to unbind translation");
        }
        debug!(original = %original, mapped = %mapping.mapped, "Translation released");
        self.release_address(tables, mapping.mapped);
    }

    fn release_address(&self, tables: &mut Tables, mapped: Ipv4Addr) {
        if let Err(e) = tables.pool.release(mapped) {
            error!(error = %e, "Address pool corrupted");
        }
    }

    async fn persist(&self, tables: Option<&Tables>) {
        let Some(tables) = tables else {
            return;
        };
        let snapshot = TranslationSnapshot {
            fingerprint: tables.fingerprint.clone(),
            mappings: tables
                .forward
                .iter()
                .map(|(original, mapping)| TranslationEntry {
                    original: *original,
                    mapped: mapping.mapped,
                })
                .collect(),
        };
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(error = %e, "Failed to save translations");
        }
    }
}

fn fingerprint_of(network: Ipv4Network) -> String {
    format!("{}/{}", network.network(), network.prefix())
}
