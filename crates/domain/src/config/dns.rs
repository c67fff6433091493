use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::host_registration::NameRegistration;
use crate::upstream::UpstreamSpec;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryStrategy {
    Sequential,

    #[default]
    Parallel,
}

impl QueryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL applied to records that arrive without one.
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    #[serde(default = "default_max_ttl")]
    pub max_ttl: u32,

    /// Used for negative entries when no SOA minimum is known.
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl: u32,

    #[serde(default = "default_high_watermark")]
    pub high_watermark: usize,

    #[serde(default = "default_low_watermark")]
    pub low_watermark: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            max_ttl: default_max_ttl(),
            negative_ttl: default_negative_ttl(),
            high_watermark: default_high_watermark(),
            low_watermark: default_low_watermark(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// Local zone, e.g. `home`. Empty means bare host names resolve.
    #[serde(default)]
    pub domain_name: String,

    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub host_ipv4: Option<Ipv4Addr>,

    #[serde(default)]
    pub host_ipv6: Option<Ipv6Addr>,

    /// Primary and secondary public resolvers.
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<IpAddr>,

    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    #[serde(default)]
    pub strategy: QueryStrategy,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub hosts: Vec<NameRegistration>,

    #[serde(default)]
    pub servers: Vec<UpstreamSpec>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            domain_name: String::new(),
            hostname: None,
            host_ipv4: None,
            host_ipv6: None,
            resolvers: default_resolvers(),
            default_timeout_ms: default_timeout_ms(),
            strategy: QueryStrategy::Parallel,
            cache: CacheConfig::default(),
            hosts: vec![],
            servers: vec![],
        }
    }
}

impl DnsConfig {
    pub fn primary_resolver(&self) -> Option<IpAddr> {
        self.resolvers.first().copied()
    }

    pub fn secondary_resolver(&self) -> Option<IpAddr> {
        self.resolvers.get(1).copied()
    }

    /// Configured server identities by ascending priority. Ties keep
    /// their order in the file.
    pub fn server_ordering(&self) -> Vec<String> {
        let mut servers: Vec<&UpstreamSpec> = self.servers.iter().collect();
        servers.sort_by_key(|spec| spec.priority);
        servers.into_iter().map(|spec| spec.identity.clone()).collect()
    }
}

fn default_resolvers() -> Vec<IpAddr> {
    vec![
        IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
        IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
    ]
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_ttl() -> u32 {
    60
}

fn default_max_ttl() -> u32 {
    3600
}

fn default_negative_ttl() -> u32 {
    30
}

fn default_high_watermark() -> usize {
    1024
}

fn default_low_watermark() -> usize {
    768
}
