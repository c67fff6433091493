pub mod cache;
pub mod resolver;
pub mod router;
pub mod server;
pub mod translation;
pub mod upstream;
pub mod wire;
pub mod zone;

pub use cache::AnswerCache;
pub use resolver::{
    AuthoritativeResolver, InMemoryMdnsHosts, MulticastBridge, Resolver, ResolverEntry,
    ReverseMapper,
};
pub use router::QueryRouter;
pub use server::DnsRequestHandler;
pub use translation::NetworkAddressTranslator;
pub use upstream::{TimingEstimator, UpstreamProxy};
pub use zone::LocalZone;
