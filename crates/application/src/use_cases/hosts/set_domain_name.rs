use std::sync::Arc;

use minke_dns_domain::DomainError;
use tracing::info;

use super::validate_label;
use crate::ports::HostRegistry;

pub struct SetDomainNameUseCase {
    registry: Arc<dyn HostRegistry>,
}

impl SetDomainNameUseCase {
    pub fn new(registry: Arc<dyn HostRegistry>) -> Self {
        Self { registry }
    }

    /// An empty domain switches the local zone to bare host names.
    pub fn execute(&self, domain: &str) -> Result<(), DomainError> {
        let domain = domain.trim().trim_end_matches('.');
        if !domain.is_empty() {
            for label in domain.split('.') {
                validate_label(label)?;
            }
        }

        self.registry.set_domain_name(&domain.to_lowercase());
        info!(domain = %domain, "Local domain name changed");
        Ok(())
    }
}
