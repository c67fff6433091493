use async_trait::async_trait;
use minke_dns_domain::{DomainError, UpstreamHandle, UpstreamSpec};

#[async_trait]
pub trait UpstreamRegistry: Send + Sync {
    async fn add_dns_server(&self, spec: UpstreamSpec) -> Result<UpstreamHandle, DomainError>;

    async fn remove_dns_server(&self, handle: &UpstreamHandle) -> Result<(), DomainError>;

    /// Apply an externally owned ordering of upstream identities.
    fn reorder(&self, identities: &[String]);
}
