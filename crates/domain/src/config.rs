pub mod dns;
pub mod errors;
pub mod logging;
pub mod root;
pub mod server;
pub mod translation;

pub use dns::{CacheConfig, DnsConfig, QueryStrategy};
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use translation::TranslationConfig;
