use hickory_proto::rr::{Name, RData, Record};

/// One cached resource record. `expires_at` is in epoch seconds.
#[derive(Clone, Debug)]
pub struct CacheRecord {
    pub name: Name,
    pub data: RData,
    pub expires_at: u64,
}

impl CacheRecord {
    pub fn new(name: Name, data: RData, expires_at: u64) -> Self {
        Self {
            name,
            data,
            expires_at,
        }
    }

    #[inline]
    pub fn is_live(&self, now: u64) -> bool {
        self.expires_at > now
    }

    /// Wire record carrying the TTL left at `now`.
    pub fn to_record(&self, now: u64) -> Record {
        let remaining = self.expires_at.saturating_sub(now).min(u64::from(u32::MAX)) as u32;
        Record::from_rdata(self.name.clone(), remaining, self.data.clone())
    }
}
