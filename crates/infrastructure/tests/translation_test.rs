use hickory_proto::rr::{RData, RecordType};
use minke_dns_application::ports::{HostRegistry, TranslationEntry, TranslationSnapshot};
use minke_dns_domain::config::TranslationConfig;
use minke_dns_domain::NameRegistration;
use minke_dns_infrastructure::dns::wire::normalize_name;
use minke_dns_infrastructure::dns::NetworkAddressTranslator;
use minke_dns_infrastructure::system::StaticNetworkDiscovery;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

mod helpers;
use helpers::{
    spec_for, MemoryTranslationStore, MockUpstream, MockUpstreamConfig, RecordingBinder,
    TestServer, TestServerBuilder,
};

// Loopback addresses bind without touching real interfaces.
const DNS_NETWORK: &str = "127.77.0.0/24";
const HOME_NETWORK: &str = "192.168.0.0/16";

struct Fixture {
    translator: Arc<NetworkAddressTranslator>,
    binder: Arc<RecordingBinder>,
    store: Arc<MemoryTranslationStore>,
}

fn fixture(config: TranslationConfig, store: MemoryTranslationStore) -> Fixture {
    let binder = Arc::new(RecordingBinder::new());
    let store = Arc::new(store);
    let discovery = Arc::new(StaticNetworkDiscovery::new(
        HOME_NETWORK.parse().unwrap(),
        DNS_NETWORK.parse().unwrap(),
    ));
    let translator = Arc::new(NetworkAddressTranslator::new(
        &config,
        discovery,
        binder.clone(),
        store.clone(),
    ));
    Fixture {
        translator,
        binder,
        store,
    }
}

fn config() -> TranslationConfig {
    TranslationConfig {
        enabled: true,
        ..TranslationConfig::default()
    }
}

fn origin(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 4, last))
}

#[tokio::test]
async fn test_allocate_before_start_does_nothing() {
    let f = fixture(config(), MemoryTranslationStore::new());

    assert!(!f.translator.is_started().await);
    assert!(f.translator.allocate(origin(4)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_mapping_reused_and_distinct_per_origin() {
    let f = fixture(config(), MemoryTranslationStore::new());
    f.translator.start().await.unwrap();

    let first = f.translator.allocate(origin(4)).await.unwrap().unwrap();
    let again = f.translator.allocate(origin(4)).await.unwrap().unwrap();
    let other = f.translator.allocate(origin(5)).await.unwrap().unwrap();

    assert_eq!(first.mapped, Ipv4Addr::new(127, 77, 0, 254));
    assert_eq!(first.mapped, again.mapped);
    assert!(Arc::ptr_eq(&first.exchange, &again.exchange));
    assert_ne!(first.mapped, other.mapped);

    assert_eq!(
        f.translator.translate_dns_network_address(first.mapped),
        Some(Ipv4Addr::new(192, 168, 4, 4))
    );
    assert!(f.binder.bound().contains(&first.mapped));
    assert_eq!(f.store.snapshot().unwrap().mappings.len(), 2);
}

#[tokio::test]
async fn test_ipv6_origin_not_translated() {
    let f = fixture(config(), MemoryTranslationStore::new());
    f.translator.start().await.unwrap();

    let lease = f.translator.allocate("fd00::1".parse().unwrap()).await.unwrap();
    assert!(lease.is_none());
}

#[tokio::test]
async fn test_saved_mappings_restored() {
    let snapshot = TranslationSnapshot {
        fingerprint: DNS_NETWORK.to_string(),
        mappings: vec![TranslationEntry {
            original: Ipv4Addr::new(192, 168, 4, 4),
            mapped: Ipv4Addr::new(127, 77, 0, 200),
        }],
    };
    let f = fixture(config(), MemoryTranslationStore::with_snapshot(snapshot));
    f.translator.start().await.unwrap();

    assert_eq!(
        f.translator
            .translate_dns_network_address(Ipv4Addr::new(127, 77, 0, 200)),
        Some(Ipv4Addr::new(192, 168, 4, 4))
    );
    let lease = f.translator.allocate(origin(4)).await.unwrap().unwrap();
    assert_eq!(lease.mapped, Ipv4Addr::new(127, 77, 0, 200));
}

#[tokio::test]
async fn test_saved_mappings_discarded_when_network_changes() {
    let snapshot = TranslationSnapshot {
        fingerprint: "10.224.0.0/24".to_string(),
        mappings: vec![TranslationEntry {
            original: Ipv4Addr::new(192, 168, 4, 4),
            mapped: Ipv4Addr::new(10, 224, 0, 200),
        }],
    };
    let f = fixture(config(), MemoryTranslationStore::with_snapshot(snapshot));
    f.translator.start().await.unwrap();

    assert_eq!(f.translator.mapping_count().await, 0);
    let saved = f.store.snapshot().unwrap();
    assert_eq!(saved.fingerprint, DNS_NETWORK);
    assert!(saved.mappings.is_empty());
}

#[tokio::test]
async fn test_expired_mapping_recycled_in_place() {
    let f = fixture(
        TranslationConfig {
            idle_ttl_secs: 0,
            ..config()
        },
        MemoryTranslationStore::new(),
    );
    f.translator.start().await.unwrap();

    let first = f.translator.allocate(origin(4)).await.unwrap().unwrap();
    let second = f.translator.allocate(origin(4)).await.unwrap().unwrap();

    assert_eq!(first.mapped, second.mapped);
    assert!(!Arc::ptr_eq(&first.exchange, &second.exchange));
    assert!(f.binder.unbinds().contains(&first.mapped));
    assert!(f.binder.bound().contains(&second.mapped));
}

#[tokio::test]
async fn test_idle_sweep_releases_mappings() {
    let f = fixture(
        TranslationConfig {
            idle_ttl_secs: 0,
            ..config()
        },
        MemoryTranslationStore::new(),
    );
    f.translator.start().await.unwrap();
    let available = f.translator.available().await;

    let lease = f.translator.allocate(origin(4)).await.unwrap().unwrap();
    let swept = f.translator.sweep_idle().await;

    assert_eq!(swept, 1);
    assert_eq!(f.translator.mapping_count().await, 0);
    assert_eq!(f.translator.available().await, available);
    assert!(f
        .translator
        .translate_dns_network_address(lease.mapped)
        .is_none());
    assert!(f.binder.bound().is_empty());
}

#[tokio::test]
async fn test_low_pool_prunes_least_recently_used() {
    let f = fixture(
        TranslationConfig {
            low_watermark: 189,
            high_watermark: 190,
            ..config()
        },
        MemoryTranslationStore::new(),
    );
    f.translator.start().await.unwrap();

    let older = f.translator.allocate(origin(4)).await.unwrap().unwrap();
    let newer = f.translator.allocate(origin(5)).await.unwrap().unwrap();

    assert_eq!(f.translator.mapping_count().await, 1);
    assert!(f
        .translator
        .translate_dns_network_address(older.mapped)
        .is_none());
    assert_eq!(
        f.translator.translate_dns_network_address(newer.mapped),
        Some(Ipv4Addr::new(192, 168, 4, 5))
    );
}

async fn translated_server(f: &Fixture) -> (TestServer, MockUpstream) {
    f.translator.start().await.unwrap();
    let upstream = MockUpstream::start(MockUpstreamConfig::answering(
        "app.example",
        Ipv4Addr::new(10, 0, 0, 1),
    ))
    .await;
    let server = TestServerBuilder::new()
        .translator(Arc::clone(&f.translator))
        .build();

    let mut spec = spec_for("app", upstream.addr(), 10);
    spec.use_address_translation = true;
    server.add_upstream_spec(spec).await;
    (server, upstream)
}

#[tokio::test]
async fn test_translated_upstream_sees_mapped_source() {
    let f = fixture(config(), MemoryTranslationStore::new());
    let (server, upstream) = translated_server(&f).await;

    let reply = server.query("app.example", RecordType::A).await;

    assert_eq!(reply.answers().len(), 1);
    let sources = upstream.sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].ip(), IpAddr::V4(Ipv4Addr::new(127, 77, 0, 254)));
}

#[tokio::test]
async fn test_reverse_lookup_of_mapped_address_names_original_client() {
    let f = fixture(config(), MemoryTranslationStore::new());
    let (server, _upstream) = translated_server(&f).await;
    server
        .authoritative
        .register_host(NameRegistration::new("laptop", Ipv4Addr::new(192, 168, 1, 50)));

    server.query("app.example", RecordType::A).await;
    let reply = server
        .query("254.0.77.127.in-addr.arpa", RecordType::PTR)
        .await;

    assert_eq!(reply.answers().len(), 1);
    let record = &reply.answers()[0];
    assert_eq!(normalize_name(record.name()), "254.0.77.127.in-addr.arpa");
    match record.data() {
        RData::PTR(target) => assert_eq!(normalize_name(&target.0), "laptop"),
        other => panic!("unexpected record {:?}", other),
    }
}

#[tokio::test]
async fn test_reverse_lookup_of_unnamed_client_falls_through() {
    let f = fixture(config(), MemoryTranslationStore::new());
    let (server, upstream) = translated_server(&f).await;

    server.query("app.example", RecordType::A).await;
    assert_eq!(upstream.hits(), 1);

    let reply = server
        .query("254.0.77.127.in-addr.arpa", RecordType::PTR)
        .await;

    // One query for the original address, then one for the mapped name itself.
    assert_eq!(upstream.hits(), 3);
    assert!(reply.answers().is_empty());
}
