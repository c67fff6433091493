use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
    Tcp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// Where a question came from, and how the router is calling a resolver.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext {
    pub origin: SocketAddr,
    pub transport: TransportKind,
    /// Set when the resolver is the lowest-priority entry: it gets the full timeout.
    pub last_resort: bool,
}

impl QueryContext {
    pub fn new(origin: SocketAddr, transport: TransportKind) -> Self {
        Self {
            origin,
            transport,
            last_resort: false,
        }
    }

    pub fn with_last_resort(mut self, last_resort: bool) -> Self {
        self.last_resort = last_resort;
        self
    }
}
