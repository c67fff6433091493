//! Minke DNS Domain Layer
pub mod config;
pub mod dns_request;
pub mod errors;
pub mod host_registration;
pub mod upstream;

pub use config::{CliOverrides, Config, ConfigError, DnsConfig};
pub use dns_request::{QueryContext, TransportKind};
pub use errors::DomainError;
pub use host_registration::NameRegistration;
pub use upstream::{UpstreamHandle, UpstreamSpec, GLOBAL_SUFFIX, SYSTEM_PRIORITY_OFFSET};
