use crate::upstream::GLOBAL_SUFFIX;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// A host published by the application registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NameRegistration {
    pub local_name: String,

    #[serde(default)]
    pub global_name: Option<String>,

    pub ipv4: Ipv4Addr,

    #[serde(default)]
    pub ipv6: Option<Ipv6Addr>,
}

impl NameRegistration {
    pub fn new(local_name: impl Into<String>, ipv4: Ipv4Addr) -> Self {
        Self {
            local_name: local_name.into(),
            global_name: None,
            ipv4,
            ipv6: None,
        }
    }

    pub fn with_global_name(mut self, global_name: impl Into<String>) -> Self {
        self.global_name = Some(global_name.into());
        self
    }

    pub fn with_ipv6(mut self, ipv6: Ipv6Addr) -> Self {
        self.ipv6 = Some(ipv6);
        self
    }

    /// Lower-cased lookup key for the local name.
    pub fn local_key(&self) -> String {
        self.local_name.to_lowercase()
    }

    /// Lower-cased uuid of a `<uuid>.minkebox.net` global name. Global
    /// names anywhere else have no key and are never served.
    pub fn global_key(&self) -> Option<String> {
        let global = self.global_name.as_deref()?.trim_end_matches('.').to_lowercase();
        let label = global.strip_suffix(GLOBAL_SUFFIX)?.strip_suffix('.')?;
        if label.is_empty() || label.contains('.') {
            return None;
        }
        Some(label.to_string())
    }
}
