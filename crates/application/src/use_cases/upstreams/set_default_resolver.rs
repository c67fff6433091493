use std::net::IpAddr;
use std::sync::Arc;

use minke_dns_domain::upstream::{GLOBAL_PRIMARY_ID, GLOBAL_SECONDARY_ID};
use minke_dns_domain::{DomainError, UpstreamHandle, UpstreamSpec};
use tracing::{debug, info};

use crate::ports::UpstreamRegistry;

/// Installs the system-level public resolvers at the two lowest priorities.
pub struct SetDefaultResolverUseCase {
    registry: Arc<dyn UpstreamRegistry>,
    timeout_ms: u64,
}

impl SetDefaultResolverUseCase {
    pub fn new(registry: Arc<dyn UpstreamRegistry>, timeout_ms: u64) -> Self {
        Self {
            registry,
            timeout_ms,
        }
    }

    pub async fn execute(
        &self,
        primary: Option<IpAddr>,
        secondary: Option<IpAddr>,
    ) -> Result<(), DomainError> {
        for id in [GLOBAL_PRIMARY_ID, GLOBAL_SECONDARY_ID] {
            let handle = UpstreamHandle {
                identity: id.to_string(),
            };
            match self.registry.remove_dns_server(&handle).await {
                Ok(()) | Err(DomainError::UpstreamNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let slots = [
            (GLOBAL_PRIMARY_ID, primary, i64::MAX - 1),
            (GLOBAL_SECONDARY_ID, secondary, i64::MAX),
        ];

        for (id, address, priority) in slots {
            let Some(address) = address else {
                debug!(slot = id, "No default resolver configured");
                continue;
            };
            let mut spec = UpstreamSpec::global(id, address, priority);
            spec.timeout_ms = self.timeout_ms;
            self.registry.add_dns_server(spec).await?;
            info!(slot = id, resolver = %address, "Default resolver installed");
        }

        Ok(())
    }
}
