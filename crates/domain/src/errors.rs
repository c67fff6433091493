use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Malformed DNS packet: {0}")]
    MalformedPacket(String),

    #[error("DNS request carries no question")]
    MissingQuestion,

    #[error("Domain not found (NXDOMAIN)")]
    NxDomain,

    #[error("Query timeout waiting for {server}")]
    UpstreamTimeout { server: String },

    #[error("Transport error talking to {server}: {reason}")]
    Transport { server: String, reason: String },

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Upstream resolver not found: {0}")]
    UpstreamNotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    pub fn transport(server: impl ToString, reason: impl ToString) -> Self {
        Self::Transport {
            server: server.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::UpstreamTimeout { .. })
    }
}
