use minke_dns_domain::NameRegistration;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Local name table the application lifecycle publishes into.
pub trait HostRegistry: Send + Sync {
    fn set_domain_name(&self, domain: &str);

    fn domain_name(&self) -> String;

    /// Publish the appliance itself, replacing any previous hostname.
    fn set_hostname(&self, hostname: &str, ipv4: Ipv4Addr, ipv6: Option<Ipv6Addr>);

    fn register_host(&self, registration: NameRegistration);

    /// Returns false when nothing was registered under that name.
    fn unregister_host(&self, local_name: &str) -> bool;

    fn lookup_localname_ip(&self, name: &str) -> Option<IpAddr>;
}
