use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use minke_dns_domain::DomainError;

#[async_trait]
pub trait NetworkDiscovery: Send + Sync {
    async fn home_network(&self) -> Result<Ipv4Network, DomainError>;

    async fn dns_network(&self) -> Result<Ipv4Network, DomainError>;
}
