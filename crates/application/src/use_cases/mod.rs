pub mod hosts;
pub mod upstreams;

pub use hosts::{RegisterHostUseCase, SetDomainNameUseCase, UnregisterHostUseCase};
pub use upstreams::{
    AddDnsServerUseCase, DnsServerOptions, RemoveDnsServerUseCase, SetDefaultResolverUseCase,
};
