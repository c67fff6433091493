use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use minke_dns_application::ports::NetworkDiscovery;
use minke_dns_domain::config::TranslationConfig;
use minke_dns_domain::DomainError;

/// Networks taken from configuration.
pub struct StaticNetworkDiscovery {
    home: Ipv4Network,
    dns: Ipv4Network,
}

impl StaticNetworkDiscovery {
    pub fn new(home: Ipv4Network, dns: Ipv4Network) -> Self {
        Self { home, dns }
    }

    pub fn from_config(config: &TranslationConfig) -> Result<Self, DomainError> {
        let parse = |subnet: &str| {
            subnet.parse::<Ipv4Network>().map_err(|e| {
                DomainError::ConfigError(format!("Invalid subnet '{}': {}", subnet, e))
            })
        };
        Ok(Self::new(parse(&config.home_network)?, parse(&config.dns_network)?))
    }
}

#[async_trait]
impl NetworkDiscovery for StaticNetworkDiscovery {
    async fn home_network(&self) -> Result<Ipv4Network, DomainError> {
        Ok(self.home)
    }

    async fn dns_network(&self) -> Result<Ipv4Network, DomainError> {
        Ok(self.dns)
    }
}
