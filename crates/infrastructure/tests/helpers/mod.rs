mod builders;
mod mock_upstream;
mod translation_mocks;

pub use builders::{request, spec_for, TestServer, TestServerBuilder};
pub use mock_upstream::{soa_record, MockUpstream, MockUpstreamConfig};
pub use translation_mocks::{MemoryTranslationStore, RecordingBinder};
