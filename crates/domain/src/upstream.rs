use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Fixed two-label domain under which every box publishes global names.
pub const GLOBAL_SUFFIX: &str = "minkebox.net";

/// Application resolvers sort after the built-in entries, starting here.
pub const SYSTEM_PRIORITY_OFFSET: i64 = 10;

pub const GLOBAL_PRIMARY_ID: &str = "global1";
pub const GLOBAL_SECONDARY_ID: &str = "global2";

/// Description of an upstream resolver to add to the router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamSpec {
    pub identity: String,

    pub address: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub use_address_translation: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_priority")]
    pub priority: i64,

    /// Public resolvers never see questions for the local zone.
    #[serde(default)]
    pub global: bool,
}

impl UpstreamSpec {
    pub fn application(identity: impl Into<String>, address: IpAddr) -> Self {
        Self {
            identity: identity.into(),
            address,
            port: default_port(),
            use_address_translation: false,
            timeout_ms: default_timeout_ms(),
            priority: SYSTEM_PRIORITY_OFFSET + default_priority(),
            global: false,
        }
    }

    pub fn global(identity: impl Into<String>, address: IpAddr, priority: i64) -> Self {
        Self {
            identity: identity.into(),
            address,
            port: default_port(),
            use_address_translation: false,
            timeout_ms: default_timeout_ms(),
            priority,
            global: true,
        }
    }
}

/// Returned by `add_dns_server`, handed back to `remove_dns_server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamHandle {
    pub identity: String,
}

impl fmt::Display for UpstreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

fn default_port() -> u16 {
    53
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_priority() -> i64 {
    5
}
