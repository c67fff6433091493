use std::sync::Arc;

use minke_dns_domain::{DomainError, UpstreamHandle};

use crate::ports::UpstreamRegistry;

pub struct RemoveDnsServerUseCase {
    registry: Arc<dyn UpstreamRegistry>,
}

impl RemoveDnsServerUseCase {
    pub fn new(registry: Arc<dyn UpstreamRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, handle: &UpstreamHandle) -> Result<(), DomainError> {
        self.registry.remove_dns_server(handle).await
    }
}
