mod add_dns_server;
mod remove_dns_server;
mod set_default_resolver;

pub use add_dns_server::{AddDnsServerUseCase, DnsServerOptions};
pub use remove_dns_server::RemoveDnsServerUseCase;
pub use set_default_resolver::SetDefaultResolverUseCase;
