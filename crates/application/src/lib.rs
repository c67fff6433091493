//! Minke DNS Application Layer
//!
//! Ports the DNS engine is built against, and the use cases through which the
//! rest of the appliance registers hosts and resolvers.
pub mod ports;
pub mod use_cases;
