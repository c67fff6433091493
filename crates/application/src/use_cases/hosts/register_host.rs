use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use minke_dns_domain::{DomainError, NameRegistration};
use tracing::info;

use super::validate_label;
use crate::ports::HostRegistry;

pub struct RegisterHostUseCase {
    registry: Arc<dyn HostRegistry>,
}

impl RegisterHostUseCase {
    pub fn new(registry: Arc<dyn HostRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        local_name: &str,
        global_name: Option<&str>,
        ipv4: &str,
        ipv6: Option<&str>,
    ) -> Result<NameRegistration, DomainError> {
        validate_label(local_name)?;

        if let Some(global) = global_name {
            for label in global.split('.') {
                validate_label(label)?;
            }
        }

        let ipv4: Ipv4Addr = ipv4
            .parse()
            .map_err(|_| DomainError::InvalidIpAddress(ipv4.to_string()))?;

        let ipv6: Option<Ipv6Addr> = match ipv6 {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| DomainError::InvalidIpAddress(raw.to_string()))?,
            ),
            None => None,
        };

        let registration = NameRegistration {
            local_name: local_name.to_string(),
            global_name: global_name.map(str::to_string),
            ipv4,
            ipv6,
        };

        self.registry.register_host(registration.clone());

        info!(
            local_name = %registration.local_name,
            global_name = ?registration.global_name,
            ipv4 = %registration.ipv4,
            "Host registered"
        );

        Ok(registration)
    }
}
