mod helpers;

use helpers::MockUpstreamRegistry;
use minke_dns_application::use_cases::{
    AddDnsServerUseCase, DnsServerOptions, RemoveDnsServerUseCase, SetDefaultResolverUseCase,
};
use minke_dns_domain::{DomainError, SYSTEM_PRIORITY_OFFSET};
use std::net::IpAddr;
use std::sync::Arc;

#[tokio::test]
async fn test_add_dns_server_offsets_priority() {
    let registry = Arc::new(MockUpstreamRegistry::new());
    let use_case = AddDnsServerUseCase::new(registry.clone());

    let options = DnsServerOptions {
        priority: 3,
        use_address_translation: true,
        ..DnsServerOptions::default()
    };
    let handle = use_case
        .execute("pihole", "172.17.0.5", options)
        .await
        .unwrap();

    assert_eq!(handle.identity, "pihole");
    let servers = registry.servers();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].priority, SYSTEM_PRIORITY_OFFSET + 3);
    assert!(servers[0].use_address_translation);
    assert!(!servers[0].global);
}

#[tokio::test]
async fn test_add_dns_server_rejects_bad_address() {
    let registry = Arc::new(MockUpstreamRegistry::new());
    let use_case = AddDnsServerUseCase::new(registry.clone());

    let result = use_case
        .execute("pihole", "not-an-ip", DnsServerOptions::default())
        .await;

    assert!(matches!(result, Err(DomainError::InvalidIpAddress(_))));
    assert!(registry.servers().is_empty());
}

#[tokio::test]
async fn test_remove_dns_server_after_add() {
    let registry = Arc::new(MockUpstreamRegistry::new());
    let handle = AddDnsServerUseCase::new(registry.clone())
        .execute("pihole", "172.17.0.5", DnsServerOptions::default())
        .await
        .unwrap();

    RemoveDnsServerUseCase::new(registry.clone())
        .execute(&handle)
        .await
        .unwrap();

    assert!(registry.servers().is_empty());
}

#[tokio::test]
async fn test_set_default_resolver_installs_both_slots_last() {
    let registry = Arc::new(MockUpstreamRegistry::new());
    let use_case = SetDefaultResolverUseCase::new(registry.clone(), 5000);

    use_case
        .execute(
            Some("8.8.8.8".parse().unwrap()),
            Some("1.1.1.1".parse().unwrap()),
        )
        .await
        .unwrap();

    let servers = registry.servers();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0].identity, "global1");
    assert_eq!(servers[0].priority, i64::MAX - 1);
    assert_eq!(servers[1].identity, "global2");
    assert_eq!(servers[1].priority, i64::MAX);
    assert!(servers.iter().all(|s| s.global));
}

#[tokio::test]
async fn test_set_default_resolver_replaces_previous() {
    let registry = Arc::new(MockUpstreamRegistry::new());
    let use_case = SetDefaultResolverUseCase::new(registry.clone(), 5000);

    use_case
        .execute(
            Some("8.8.8.8".parse().unwrap()),
            Some("1.1.1.1".parse().unwrap()),
        )
        .await
        .unwrap();
    use_case
        .execute(Some("9.9.9.9".parse().unwrap()), None)
        .await
        .unwrap();

    let servers = registry.servers();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].address, "9.9.9.9".parse::<IpAddr>().unwrap());
}
