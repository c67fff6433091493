use async_trait::async_trait;
use minke_dns_domain::DomainError;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationEntry {
    pub original: Ipv4Addr,
    pub mapped: Ipv4Addr,
}

/// Durable address-translation table. Only valid while the DNS network
/// keeps the same subnet, recorded as `fingerprint`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationSnapshot {
    pub fingerprint: String,
    pub mappings: Vec<TranslationEntry>,
}

#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn load(&self) -> Result<Option<TranslationSnapshot>, DomainError>;

    async fn save(&self, snapshot: &TranslationSnapshot) -> Result<(), DomainError>;
}
