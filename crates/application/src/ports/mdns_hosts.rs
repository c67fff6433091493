use std::net::IpAddr;

/// Host table maintained by the mDNS subsystem.
pub trait MdnsHostTable: Send + Sync {
    /// `hostname` is the bare name without the `.local` suffix, lower-cased.
    fn lookup(&self, hostname: &str) -> Vec<IpAddr>;
}
