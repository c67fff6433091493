mod key;
mod negative_ttl;
mod record;

pub use key::CacheKey;
pub use negative_ttl::{enclosing_zones, extract_negative_ttl};
pub use record::CacheRecord;

use crate::dns::wire::normalize_name;
use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::{RData, Record, RecordType};
use minke_dns_application::ports::{Answer, QueryResolver};
use minke_dns_domain::config::CacheConfig;
use minke_dns_domain::{DomainError, QueryContext};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, error};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Default)]
struct Slot {
    records: Vec<CacheRecord>,
    negative_until: Option<u64>,
    /// The negative entry came from NXDOMAIN rather than NODATA.
    nx_domain: bool,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.records.is_empty() && self.negative_until.is_none()
    }
}

#[derive(Default)]
struct CacheState {
    slots: FxHashMap<CacheKey, Slot>,
    records: usize,
    negatives: usize,
    trim_scheduled: bool,
}

impl CacheState {
    fn tracked(&self) -> usize {
        self.records + self.negatives
    }

    fn live_records(&self, name: &str, record_type: RecordType, now: u64) -> Vec<&CacheRecord> {
        self.slots
            .get(&CacheKey::new(name, record_type))
            .map(|slot| slot.records.iter().filter(|r| r.is_live(now)).collect())
            .unwrap_or_default()
    }

    /// Whether a live negative entry exists, and if so whether it is NXDOMAIN.
    fn negative_live(&self, name: &str, record_type: RecordType, now: u64) -> Option<bool> {
        self.slots
            .get(&CacheKey::new(name, record_type))
            .filter(|slot| slot.negative_until.is_some_and(|until| until > now))
            .map(|slot| slot.nx_domain)
    }

    /// Live SOA of the closest enclosing zone, with the TTL it has left.
    fn closest_soa(&self, name: &str, now: u64) -> Option<&CacheRecord> {
        enclosing_zones(name).find_map(|zone| self.live_records(zone, RecordType::SOA, now).pop())
    }

    fn insert_record(&mut self, record: &Record, expires_at: u64) {
        let key = CacheKey::new(&normalize_name(record.name()), record.record_type());
        let slot = self.slots.entry(key).or_default();

        if slot.negative_until.take().is_some() {
            slot.nx_domain = false;
            self.negatives -= 1;
        }

        match slot.records.iter_mut().find(|r| &r.data == record.data()) {
            Some(existing) => existing.expires_at = expires_at,
            None => {
                slot.records.push(CacheRecord::new(
                    record.name().clone(),
                    record.data().clone(),
                    expires_at,
                ));
                self.records += 1;
            }
        }
    }

    fn insert_negative(&mut self, key: CacheKey, expires_at: u64, nx_domain: bool) {
        let slot = self.slots.entry(key).or_default();
        slot.nx_domain = nx_domain;
        if slot.negative_until.replace(expires_at).is_none() {
            self.negatives += 1;
        }
    }

    /// Drop the entries closest to expiry until `target` remain.
    fn trim_to(&mut self, target: usize) {
        let excess = self.tracked().saturating_sub(target);
        if excess == 0 {
            return;
        }

        let mut candidates: Vec<(u64, CacheKey, Option<RData>)> = Vec::with_capacity(self.tracked());
        for (key, slot) in &self.slots {
            for record in &slot.records {
                candidates.push((record.expires_at, key.clone(), Some(record.data.clone())));
            }
            if let Some(until) = slot.negative_until {
                candidates.push((until, key.clone(), None));
            }
        }
        candidates.sort_by_key(|(expires_at, _, _)| *expires_at);

        for (_, key, data) in candidates.into_iter().take(excess) {
            let Some(slot) = self.slots.get_mut(&key) else {
                error!(name = %key.name, record_type = %key.record_type, "Missing trim entry");
                continue;
            };
            match data {
                Some(data) => match slot.records.iter().position(|r| r.data == data) {
                    Some(index) => {
                        slot.records.swap_remove(index);
                        self.records -= 1;
                    }
                    None => {
                        error!(name = %key.name, record_type = %key.record_type, "Missing trim entry");
                    }
                },
                None => {
                    if slot.negative_until.take().is_some() {
                        self.negatives -= 1;
                    }
                }
            }
            if slot.is_empty() {
                self.slots.remove(&key);
            }
        }

        debug!(remaining = self.tracked(), "Answer cache trimmed");
    }
}

/// TTL-bounded store of upstream answers, positive and negative, with
/// watermark eviction.
pub struct AnswerCache {
    state: Arc<Mutex<CacheState>>,
    config: CacheConfig,
    trim_task: Mutex<Option<JoinHandle<()>>>,
}

impl AnswerCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            config,
            trim_task: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of positive records held, live or not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().records
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tracked() == 0
    }

    pub fn negative_len(&self) -> usize {
        self.lock().negatives
    }

    pub fn add(&self, request: &Message, answer: &Answer) {
        self.add_at(request, answer, now_secs());
    }

    pub fn lookup(&self, request: &Message) -> Option<Answer> {
        self.lookup_at(request, now_secs())
    }

    pub fn flush(&self) {
        if let Some(task) = self
            .trim_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        let mut state = self.lock();
        *state = CacheState::default();
        debug!("Answer cache flushed");
    }

    fn expiry_for(&self, ttl: u32, now: u64) -> u64 {
        let ttl = if ttl == 0 { self.config.default_ttl } else { ttl };
        now + u64::from(ttl.min(self.config.max_ttl))
    }

    fn add_at(&self, request: &Message, answer: &Answer, now: u64) {
        if answer.truncated {
            return;
        }
        let Some(question) = request.queries().first() else {
            return;
        };
        let qname = normalize_name(question.name());
        let qtype = question.query_type();

        let over_watermark = {
            let mut state = self.lock();

            let positives = answer
                .answers
                .iter()
                .chain(answer.additionals.iter())
                .filter(|r| {
                    matches!(
                        r.record_type(),
                        RecordType::A | RecordType::AAAA | RecordType::CNAME | RecordType::SOA
                    )
                })
                .chain(
                    answer
                        .authorities
                        .iter()
                        .filter(|r| r.record_type() == RecordType::SOA),
                );
            for record in positives {
                state.insert_record(record, self.expiry_for(record.ttl(), now));
            }

            let answered = answer.answers.iter().any(|r| r.record_type() == qtype);
            if !answered {
                let ttl = extract_negative_ttl(&answer.authorities)
                    .or_else(|| {
                        state.closest_soa(&qname, now).and_then(|soa| match &soa.data {
                            RData::SOA(data) => Some(
                                data.minimum()
                                    .min(soa.expires_at.saturating_sub(now) as u32),
                            ),
                            _ => None,
                        })
                    })
                    .unwrap_or(self.config.negative_ttl)
                    .min(self.config.max_ttl);

                if ttl > 0 {
                    let nx_domain = answer.is_nx_domain();
                    state.insert_negative(
                        CacheKey::new(&qname, qtype),
                        now + u64::from(ttl),
                        nx_domain,
                    );
                    debug!(name = %qname, record_type = %qtype, ttl, nx_domain, "Negative answer cached");
                }
            }

            if state.tracked() > self.config.high_watermark && !state.trim_scheduled {
                state.trim_scheduled = true;
                true
            } else {
                false
            }
        };

        if over_watermark {
            self.schedule_trim();
        }
    }

    fn schedule_trim(&self) {
        let low_watermark = self.config.low_watermark;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let state = Arc::clone(&self.state);
                let task = handle.spawn(async move {
                    tokio::task::yield_now().await;
                    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.trim_to(low_watermark);
                    state.trim_scheduled = false;
                });
                *self.trim_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
            }
            Err(_) => {
                let mut state = self.lock();
                state.trim_to(low_watermark);
                state.trim_scheduled = false;
            }
        }
    }

    fn lookup_at(&self, request: &Message, now: u64) -> Option<Answer> {
        let question = request.queries().first()?;
        let qname = normalize_name(question.name());
        let qtype = question.query_type();
        let state = self.lock();

        let to_records = |records: Vec<&CacheRecord>| -> Vec<Record> {
            records.into_iter().map(|r| r.to_record(now)).collect()
        };

        match qtype {
            RecordType::A | RecordType::AAAA => {
                let direct = state.live_records(&qname, qtype, now);
                if !direct.is_empty() {
                    return Some(Answer::new(to_records(direct)));
                }

                if let Some(cname) = state.live_records(&qname, RecordType::CNAME, now).pop() {
                    if let RData::CNAME(target) = &cname.data {
                        let chained = state.live_records(&normalize_name(&target.0), qtype, now);
                        if !chained.is_empty() {
                            let mut answers = vec![cname.to_record(now)];
                            answers.extend(to_records(chained));
                            return Some(Answer::new(answers));
                        }
                    }
                }
            }
            RecordType::CNAME => {
                let cnames = state.live_records(&qname, RecordType::CNAME, now);
                if !cnames.is_empty() {
                    let mut additionals = Vec::new();
                    for cname in &cnames {
                        if let RData::CNAME(target) = &cname.data {
                            let target = normalize_name(&target.0);
                            for family in [RecordType::A, RecordType::AAAA] {
                                additionals
                                    .extend(to_records(state.live_records(&target, family, now)));
                            }
                        }
                    }
                    return Some(Answer::new(to_records(cnames)).with_additionals(additionals));
                }
            }
            RecordType::SOA => {
                let soa = state.live_records(&qname, RecordType::SOA, now);
                if !soa.is_empty() {
                    return Some(Answer::new(to_records(soa)));
                }
            }
            _ => {}
        }

        if let Some(nx_domain) = state.negative_live(&qname, qtype, now) {
            let authorities = state
                .closest_soa(&qname, now)
                .map(|soa| vec![soa.to_record(now)])
                .unwrap_or_default();
            let negative = if nx_domain {
                Answer::nx_domain()
            } else {
                Answer::no_data()
            };
            return Some(negative.with_authorities(authorities));
        }

        None
    }
}

#[async_trait]
impl QueryResolver for AnswerCache {
    async fn query(
        &self,
        request: &Message,
        _ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError> {
        Ok(self.lookup(request))
    }

    fn name(&self) -> &'static str {
        "cache"
    }
}
