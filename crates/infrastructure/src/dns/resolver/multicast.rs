use crate::dns::wire::normalize_name;
use async_trait::async_trait;
use dashmap::DashMap;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};
use minke_dns_application::ports::{Answer, MdnsHostTable, QueryResolver};
use minke_dns_domain::{DomainError, QueryContext};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

const MDNS_TTL: u32 = 60;
const LOCAL_SUFFIX: &str = ".local";

/// Host table fed by whatever mDNS responder runs beside the server.
#[derive(Default)]
pub struct InMemoryMdnsHosts {
    hosts: DashMap<String, Vec<IpAddr>>,
}

impl InMemoryMdnsHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, hostname: &str, addresses: Vec<IpAddr>) {
        self.hosts.insert(hostname.to_ascii_lowercase(), addresses);
    }

    pub fn remove(&self, hostname: &str) -> bool {
        self.hosts.remove(&hostname.to_ascii_lowercase()).is_some()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl MdnsHostTable for InMemoryMdnsHosts {
    fn lookup(&self, hostname: &str) -> Vec<IpAddr> {
        self.hosts
            .get(hostname)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

/// Answers `*.local` questions from the mDNS host table. Nothing under
/// `.local` ever leaves the box.
pub struct MulticastBridge {
    hosts: Arc<dyn MdnsHostTable>,
}

impl MulticastBridge {
    pub fn new(hosts: Arc<dyn MdnsHostTable>) -> Self {
        Self { hosts }
    }
}

#[async_trait]
impl QueryResolver for MulticastBridge {
    async fn query(
        &self,
        request: &Message,
        _ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError> {
        let question = request.queries().first().ok_or(DomainError::MissingQuestion)?;
        let qname = normalize_name(question.name());
        let hostname = match qname.strip_suffix(LOCAL_SUFFIX) {
            Some(hostname) => hostname,
            // The bare zone name holds no host of its own.
            None if qname == LOCAL_SUFFIX[1..] => "",
            None => return Ok(None),
        };

        let addresses = self.hosts.lookup(hostname);
        if addresses.is_empty() {
            debug!(name = %qname, "mDNS host unknown");
            return Ok(Some(Answer::nx_domain()));
        }

        let records: Vec<Record> = addresses
            .into_iter()
            .filter_map(|address| match (question.query_type(), address) {
                (RecordType::A, IpAddr::V4(ip)) => Some(RData::A(A(ip))),
                (RecordType::AAAA, IpAddr::V6(ip)) => Some(RData::AAAA(AAAA(ip))),
                _ => None,
            })
            .map(|data| Record::from_rdata(question.name().clone(), MDNS_TTL, data))
            .collect();

        Ok(Some(Answer::new(records)))
    }

    fn name(&self) -> &'static str {
        "multicast"
    }
}
