mod host_registry;
mod interface_binder;
mod mdns_hosts;
mod network_discovery;
mod query_resolver;
mod translation_store;
mod upstream_registry;

pub use host_registry::HostRegistry;
pub use interface_binder::InterfaceBinder;
pub use mdns_hosts::MdnsHostTable;
pub use network_discovery::NetworkDiscovery;
pub use query_resolver::{Answer, QueryResolver};
pub use translation_store::{TranslationEntry, TranslationSnapshot, TranslationStore};
pub use upstream_registry::UpstreamRegistry;
