mod mock_registries;

pub use mock_registries::{MockHostRegistry, MockUpstreamRegistry};
