use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use super::dns::DnsConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::translation::TranslationConfig;

/// Main configuration structure for Minke DNS
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener configuration (port, bind address)
    #[serde(default)]
    pub server: ServerConfig,

    /// Resolution, cache and registration configuration
    #[serde(default)]
    pub dns: DnsConfig,

    /// DNS network address translation
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. minke-dns.toml in current directory
    /// 3. /etc/minke-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(found) = Self::get_config_path() {
            Self::from_file(&found)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }

        let cache = &self.dns.cache;
        if cache.low_watermark >= cache.high_watermark {
            return Err(ConfigError::Validation(format!(
                "Cache low watermark ({}) must be below high watermark ({})",
                cache.low_watermark, cache.high_watermark
            )));
        }

        if self.dns.default_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Default upstream timeout cannot be 0".to_string(),
            ));
        }

        let translation = &self.translation;
        if translation.enabled {
            if translation.low_watermark >= translation.high_watermark {
                return Err(ConfigError::Validation(format!(
                    "Translation low watermark ({}) must be below high watermark ({})",
                    translation.low_watermark, translation.high_watermark
                )));
            }
            for subnet in [&translation.dns_network, &translation.home_network] {
                subnet.parse::<Ipv4Network>().map_err(|e| {
                    ConfigError::Validation(format!("Invalid subnet '{}': {}", subnet, e))
                })?;
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new("minke-dns.toml").exists() {
            Some("minke-dns.toml".to_string())
        } else if std::path::Path::new("/etc/minke-dns/config.toml").exists() {
            Some("/etc/minke-dns/config.toml".to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}
