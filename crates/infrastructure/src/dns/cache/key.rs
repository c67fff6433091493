use hickory_proto::rr::RecordType;
use std::sync::Arc;

/// Lower-cased owner name plus record type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: Arc<str>,
    pub record_type: RecordType,
}

impl CacheKey {
    #[inline]
    pub fn new(name: &str, record_type: RecordType) -> Self {
        Self {
            name: Arc::from(name.to_ascii_lowercase()),
            record_type,
        }
    }
}
