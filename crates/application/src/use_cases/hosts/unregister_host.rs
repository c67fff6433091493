use std::sync::Arc;

use minke_dns_domain::DomainError;
use tracing::{debug, info};

use crate::ports::HostRegistry;

pub struct UnregisterHostUseCase {
    registry: Arc<dyn HostRegistry>,
}

impl UnregisterHostUseCase {
    pub fn new(registry: Arc<dyn HostRegistry>) -> Self {
        Self { registry }
    }

    /// Unregistering an unknown host is not an error; the lifecycle may
    /// stop an application that never got as far as registering.
    pub fn execute(&self, local_name: &str) -> Result<bool, DomainError> {
        if local_name.is_empty() {
            return Err(DomainError::InvalidDomainName(local_name.to_string()));
        }

        let removed = self.registry.unregister_host(local_name);
        if removed {
            info!(local_name = %local_name, "Host unregistered");
        } else {
            debug!(local_name = %local_name, "Unregister of unknown host ignored");
        }
        Ok(removed)
    }
}
