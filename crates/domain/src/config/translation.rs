use serde::{Deserialize, Serialize};

/// Settings for the DNS network used to give per-application upstream
/// queries a distinguishable source address.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_dns_network")]
    pub dns_network: String,

    #[serde(default = "default_home_network")]
    pub home_network: String,

    #[serde(default = "default_state_path")]
    pub state_path: String,

    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    #[serde(default = "default_low_watermark")]
    pub low_watermark: usize,

    #[serde(default = "default_high_watermark")]
    pub high_watermark: usize,

    #[serde(default = "default_ip_command")]
    pub ip_command: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device: default_device(),
            dns_network: default_dns_network(),
            home_network: default_home_network(),
            state_path: default_state_path(),
            idle_ttl_secs: default_idle_ttl_secs(),
            low_watermark: default_low_watermark(),
            high_watermark: default_high_watermark(),
            ip_command: default_ip_command(),
        }
    }
}

fn default_device() -> String {
    "eth1".to_string()
}

fn default_dns_network() -> String {
    "10.224.0.0/24".to_string()
}

fn default_home_network() -> String {
    "192.168.1.0/24".to_string()
}

fn default_state_path() -> String {
    "/var/lib/minke-dns/translation.json".to_string()
}

fn default_idle_ttl_secs() -> u64 {
    600
}

fn default_low_watermark() -> usize {
    20
}

fn default_high_watermark() -> usize {
    50
}

fn default_ip_command() -> String {
    "/sbin/ip".to_string()
}
