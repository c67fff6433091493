use super::DnsServices;
use minke_dns_application::ports::{HostRegistry, UpstreamRegistry};
use minke_dns_application::use_cases::{
    AddDnsServerUseCase, RegisterHostUseCase, RemoveDnsServerUseCase, SetDefaultResolverUseCase,
    SetDomainNameUseCase, UnregisterHostUseCase,
};
use minke_dns_domain::Config;
use std::sync::Arc;

#[allow(dead_code)]
pub struct UseCases {
    pub set_domain_name: Arc<SetDomainNameUseCase>,
    pub register_host: Arc<RegisterHostUseCase>,
    pub unregister_host: Arc<UnregisterHostUseCase>,
    pub add_dns_server: Arc<AddDnsServerUseCase>,
    pub remove_dns_server: Arc<RemoveDnsServerUseCase>,
    pub set_default_resolver: Arc<SetDefaultResolverUseCase>,
}

impl UseCases {
    pub fn new(services: &DnsServices, config: &Config) -> Self {
        let hosts: Arc<dyn HostRegistry> = services.authoritative.clone();
        let upstreams: Arc<dyn UpstreamRegistry> = services.router.clone();

        Self {
            set_domain_name: Arc::new(SetDomainNameUseCase::new(hosts.clone())),
            register_host: Arc::new(RegisterHostUseCase::new(hosts.clone())),
            unregister_host: Arc::new(UnregisterHostUseCase::new(hosts)),
            add_dns_server: Arc::new(AddDnsServerUseCase::new(upstreams.clone())),
            remove_dns_server: Arc::new(RemoveDnsServerUseCase::new(upstreams.clone())),
            set_default_resolver: Arc::new(SetDefaultResolverUseCase::new(
                upstreams,
                config.dns.default_timeout_ms,
            )),
        }
    }
}
