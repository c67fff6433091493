use minke_dns_domain::config::{CliOverrides, Config, DnsConfig, QueryStrategy};
use std::net::IpAddr;

#[test]
fn test_config_default_values() {
    let config = DnsConfig::default();

    assert!(config.domain_name.is_empty());
    assert_eq!(config.default_timeout_ms, 5000);
    assert_eq!(config.strategy, QueryStrategy::Parallel);
    assert_eq!(config.cache.default_ttl, 60);
    assert_eq!(config.cache.max_ttl, 3600);
    assert_eq!(config.cache.negative_ttl, 30);
    assert!(config.cache.low_watermark < config.cache.high_watermark);
    assert_eq!(
        config.primary_resolver(),
        Some("8.8.8.8".parse::<IpAddr>().unwrap())
    );
    assert_eq!(
        config.secondary_resolver(),
        Some("1.1.1.1".parse::<IpAddr>().unwrap())
    );
}

#[test]
fn test_config_parses_hosts_and_servers() {
    let toml_str = r#"
        [server]
        dns_port = 5353

        [dns]
        domain_name = "myhome"
        strategy = "sequential"
        resolvers = ["9.9.9.9"]

        [[dns.hosts]]
        local_name = "ahost"
        global_name = "862fff1a-ce59-478d-8e8d-895f3303cb1e.minkebox.net"
        ipv4 = "10.10.1.3"

        [[dns.servers]]
        identity = "pihole"
        address = "172.17.0.5"
        use_address_translation = true
        priority = 12
    "#;

    let config = Config::from_toml(toml_str).unwrap();

    assert_eq!(config.server.dns_port, 5353);
    assert_eq!(config.dns.domain_name, "myhome");
    assert_eq!(config.dns.strategy, QueryStrategy::Sequential);
    assert_eq!(config.dns.secondary_resolver(), None);
    assert_eq!(config.dns.hosts.len(), 1);
    assert_eq!(config.dns.hosts[0].local_name, "ahost");
    assert_eq!(config.dns.servers[0].port, 53);
    assert_eq!(config.dns.servers[0].timeout_ms, 5000);
    assert!(config.dns.servers[0].use_address_translation);
    assert!(!config.dns.servers[0].global);
    assert!(config.validate().is_ok());
}

#[test]
fn test_server_ordering_follows_configured_priority() {
    let toml_str = r#"
        [[dns.servers]]
        identity = "late"
        address = "172.17.0.7"
        priority = 30

        [[dns.servers]]
        identity = "early"
        address = "172.17.0.5"
        priority = 10

        [[dns.servers]]
        identity = "also-late"
        address = "172.17.0.8"
        priority = 30
    "#;

    let config = Config::from_toml(toml_str).unwrap();

    assert_eq!(
        config.dns.server_ordering(),
        vec!["early", "late", "also-late"]
    );
}

#[test]
fn test_config_rejects_zero_port() {
    let mut config = Config::default();
    config.server.dns_port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_rejects_inverted_cache_watermarks() {
    let mut config = Config::default();
    config.dns.cache.low_watermark = 100;
    config.dns.cache.high_watermark = 50;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_rejects_bad_translation_subnet_when_enabled() {
    let mut config = Config::default();
    config.translation.dns_network = "not-a-subnet".to_string();
    assert!(config.validate().is_ok());

    config.translation.enabled = true;
    assert!(config.validate().is_err());
}

#[test]
fn test_cli_overrides_applied() {
    let overrides = CliOverrides {
        dns_port: Some(1053),
        bind_address: Some("127.0.0.1".to_string()),
        log_level: Some("debug".to_string()),
    };

    let config = Config::load(Some("/nonexistent/minke.toml"), CliOverrides::default());
    assert!(config.is_err());

    let dir = std::env::temp_dir().join(format!("minke-dns-cfg-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    Config::default().save(path.to_str().unwrap()).unwrap();

    let config = Config::load(path.to_str(), overrides).unwrap();

    assert_eq!(config.server.dns_port, 1053);
    assert_eq!(config.server.bind_address, "127.0.0.1");
    assert_eq!(config.logging.level, "debug");
}
