pub mod interface_binder;
pub mod network_discovery;

pub use interface_binder::IpCommandBinder;
pub use network_discovery::StaticNetworkDiscovery;
