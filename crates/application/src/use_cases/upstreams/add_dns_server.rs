use std::net::IpAddr;
use std::sync::Arc;

use minke_dns_domain::{DomainError, UpstreamHandle, UpstreamSpec, SYSTEM_PRIORITY_OFFSET};

use crate::ports::UpstreamRegistry;

/// Options an application advertises with its DNS capability.
#[derive(Debug, Clone)]
pub struct DnsServerOptions {
    pub port: u16,
    pub use_address_translation: bool,
    pub timeout_ms: u64,
    pub priority: i64,
}

impl Default for DnsServerOptions {
    fn default() -> Self {
        Self {
            port: 53,
            use_address_translation: false,
            timeout_ms: 5000,
            priority: 5,
        }
    }
}

pub struct AddDnsServerUseCase {
    registry: Arc<dyn UpstreamRegistry>,
}

impl AddDnsServerUseCase {
    pub fn new(registry: Arc<dyn UpstreamRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        identity: &str,
        address: &str,
        options: DnsServerOptions,
    ) -> Result<UpstreamHandle, DomainError> {
        if identity.is_empty() {
            return Err(DomainError::ConfigError(
                "DNS server identity cannot be empty".to_string(),
            ));
        }

        let address: IpAddr = address
            .parse()
            .map_err(|_| DomainError::InvalidIpAddress(address.to_string()))?;

        if options.port == 0 {
            return Err(DomainError::ConfigError(format!(
                "DNS server {} has port 0",
                identity
            )));
        }

        let spec = UpstreamSpec {
            identity: identity.to_string(),
            address,
            port: options.port,
            use_address_translation: options.use_address_translation,
            timeout_ms: options.timeout_ms.max(1),
            priority: SYSTEM_PRIORITY_OFFSET + options.priority.max(0),
            global: false,
        };

        self.registry.add_dns_server(spec).await
    }
}
