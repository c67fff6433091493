#![allow(dead_code)]

use async_trait::async_trait;
use minke_dns_application::ports::{HostRegistry, UpstreamRegistry};
use minke_dns_domain::{DomainError, NameRegistration, UpstreamHandle, UpstreamSpec};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockHostRegistry {
    hosts: Arc<Mutex<HashMap<String, NameRegistration>>>,
    domain: Arc<Mutex<String>>,
}

impl MockHostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self, local_name: &str) -> Option<NameRegistration> {
        self.hosts.lock().unwrap().get(local_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.hosts.lock().unwrap().len()
    }
}

impl HostRegistry for MockHostRegistry {
    fn set_domain_name(&self, domain: &str) {
        *self.domain.lock().unwrap() = domain.to_string();
    }

    fn domain_name(&self) -> String {
        self.domain.lock().unwrap().clone()
    }

    fn set_hostname(&self, hostname: &str, ipv4: Ipv4Addr, ipv6: Option<Ipv6Addr>) {
        let mut reg = NameRegistration::new(hostname, ipv4);
        reg.ipv6 = ipv6;
        self.register_host(reg);
    }

    fn register_host(&self, registration: NameRegistration) {
        self.hosts
            .lock()
            .unwrap()
            .insert(registration.local_name.clone(), registration);
    }

    fn unregister_host(&self, local_name: &str) -> bool {
        self.hosts.lock().unwrap().remove(local_name).is_some()
    }

    fn lookup_localname_ip(&self, name: &str) -> Option<IpAddr> {
        self.hosts
            .lock()
            .unwrap()
            .get(name)
            .map(|r| IpAddr::V4(r.ipv4))
    }
}

#[derive(Clone, Default)]
pub struct MockUpstreamRegistry {
    servers: Arc<Mutex<Vec<UpstreamSpec>>>,
    order: Arc<Mutex<Vec<String>>>,
}

impl MockUpstreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn servers(&self) -> Vec<UpstreamSpec> {
        self.servers.lock().unwrap().clone()
    }

    pub fn last_order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamRegistry for MockUpstreamRegistry {
    async fn add_dns_server(&self, spec: UpstreamSpec) -> Result<UpstreamHandle, DomainError> {
        let handle = UpstreamHandle {
            identity: spec.identity.clone(),
        };
        self.servers.lock().unwrap().push(spec);
        Ok(handle)
    }

    async fn remove_dns_server(&self, handle: &UpstreamHandle) -> Result<(), DomainError> {
        let mut servers = self.servers.lock().unwrap();
        let before = servers.len();
        servers.retain(|s| s.identity != handle.identity);
        if servers.len() == before {
            return Err(DomainError::UpstreamNotFound(handle.identity.clone()));
        }
        Ok(())
    }

    fn reorder(&self, identities: &[String]) {
        *self.order.lock().unwrap() = identities.to_vec();
    }
}
