use async_trait::async_trait;
use minke_dns_domain::DomainError;
use std::net::Ipv4Addr;

/// OS-level address management on the DNS network device.
#[async_trait]
pub trait InterfaceBinder: Send + Sync {
    async fn bind(&self, address: Ipv4Addr, prefix: u8) -> Result<(), DomainError>;

    async fn unbind(&self, address: Ipv4Addr, prefix: u8) -> Result<(), DomainError>;
}
