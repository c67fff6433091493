use hickory_proto::rr::{RData, Record};

/// RFC 2308 §5: the negative TTL is the smaller of the SOA record's own TTL
/// and its MINIMUM field.
pub fn extract_negative_ttl(authority_records: &[Record]) -> Option<u32> {
    authority_records.iter().find_map(|r| {
        if let RData::SOA(soa) = r.data() {
            Some(soa.minimum().min(r.ttl()))
        } else {
            None
        }
    })
}

/// `a.b.c` yields `a.b.c`, `b.c`, `c`.
pub fn enclosing_zones(name: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(name).filter(|n| !n.is_empty());
    std::iter::from_fn(move || {
        let current = rest?;
        rest = current.split_once('.').map(|(_, parent)| parent);
        Some(current)
    })
}
