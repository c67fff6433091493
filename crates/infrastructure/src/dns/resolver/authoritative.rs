use crate::dns::wire::{ip_from_reverse_name, normalize_name, parse_name};
use crate::dns::zone::LocalZone;
use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::{A, AAAA, PTR, SOA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use minke_dns_application::ports::{Answer, HostRegistry, QueryResolver};
use minke_dns_domain::{DomainError, NameRegistration, QueryContext, GLOBAL_SUFFIX};
use rustc_hash::FxHashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

const AUTHORITATIVE_TTL: u32 = 60;

#[derive(Default)]
struct HostTables {
    by_local: FxHashMap<String, NameRegistration>,
    /// Uuid label of a `<uuid>.minkebox.net` global name to local key.
    by_global: FxHashMap<String, String>,
    /// Address to local name as registered.
    by_ip: FxHashMap<IpAddr, String>,
}

impl HostTables {
    fn insert(&mut self, registration: NameRegistration) {
        let key = registration.local_key();
        self.remove(&key);

        if let Some(global) = registration.global_key() {
            self.by_global.insert(global, key.clone());
        }
        self.by_ip
            .insert(IpAddr::V4(registration.ipv4), registration.local_name.clone());
        if let Some(ipv6) = registration.ipv6 {
            self.by_ip
                .insert(IpAddr::V6(ipv6), registration.local_name.clone());
        }
        self.by_local.insert(key, registration);
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(registration) = self.by_local.remove(key) else {
            return false;
        };
        if let Some(global) = registration.global_key() {
            // Another host may have taken over the same global name.
            if self.by_global.get(&global).is_some_and(|owner| *owner == key) {
                self.by_global.remove(&global);
            }
        }
        let addresses = std::iter::once(IpAddr::V4(registration.ipv4))
            .chain(registration.ipv6.map(IpAddr::V6));
        for address in addresses {
            // A newer registration may have claimed the address since.
            if self
                .by_ip
                .get(&address)
                .is_some_and(|name| name.eq_ignore_ascii_case(&registration.local_name))
            {
                self.by_ip.remove(&address);
            }
        }
        true
    }
}

fn is_single_label(label: &str) -> bool {
    !label.is_empty() && !label.contains('.')
}

/// Answers for hosts registered by the local application registry.
pub struct AuthoritativeResolver {
    zone: Arc<LocalZone>,
    tables: RwLock<HostTables>,
    hostname: Mutex<Option<String>>,
    serial: AtomicU32,
}

impl AuthoritativeResolver {
    pub fn new(zone: Arc<LocalZone>) -> Self {
        Self {
            zone,
            tables: RwLock::new(HostTables::default()),
            hostname: Mutex::new(None),
            serial: AtomicU32::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HostTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HostTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump_serial(&self) {
        self.serial.fetch_add(1, Ordering::Relaxed);
    }

    /// Registration for a query name: `name` (only without a domain),
    /// `name.<domain>`, or `<global key>.minkebox.net`.
    fn find_host(&self, qname: &str) -> Option<NameRegistration> {
        let domain = self.zone.domain();
        let tables = self.read();

        if domain.is_empty() {
            if is_single_label(qname) {
                if let Some(found) = tables.by_local.get(qname) {
                    return Some(found.clone());
                }
            }
        } else if let Some(label) = qname
            .strip_suffix(domain.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|label| is_single_label(label))
        {
            if let Some(found) = tables.by_local.get(label) {
                return Some(found.clone());
            }
        }

        qname
            .strip_suffix(GLOBAL_SUFFIX)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|label| is_single_label(label))
            .and_then(|label| tables.by_global.get(label))
            .and_then(|key| tables.by_local.get(key))
            .cloned()
    }

    fn soa_record(&self) -> Option<Record> {
        let domain = self.zone.domain();
        let apex = parse_name(&domain).ok()?;
        let (mname, rname) = if domain.is_empty() {
            (parse_name("ns").ok()?, parse_name("hostmaster").ok()?)
        } else {
            (
                parse_name(&format!("ns.{}", domain)).ok()?,
                parse_name(&format!("hostmaster.{}", domain)).ok()?,
            )
        };
        let ttl = AUTHORITATIVE_TTL as i32;
        let soa = SOA::new(
            mname,
            rname,
            self.serial.load(Ordering::Relaxed),
            ttl,
            ttl,
            2 * ttl,
            AUTHORITATIVE_TTL / 10,
        );
        Some(Record::from_rdata(apex, AUTHORITATIVE_TTL, RData::SOA(soa)))
    }

    /// SOA for the authority section, only when a domain is configured.
    fn zone_authority(&self) -> Vec<Record> {
        if self.zone.domain().is_empty() {
            return vec![];
        }
        self.soa_record().into_iter().collect()
    }

    fn address_answer(&self, qname: &Name, qtype: RecordType, host: &NameRegistration) -> Answer {
        let v4 = Record::from_rdata(qname.clone(), AUTHORITATIVE_TTL, RData::A(A(host.ipv4)));
        let v6 = host
            .ipv6
            .map(|ip| Record::from_rdata(qname.clone(), AUTHORITATIVE_TTL, RData::AAAA(AAAA(ip))));

        let (answer, additional) = match qtype {
            RecordType::A => (Some(v4), v6),
            _ => (v6, Some(v4)),
        };

        let authorities = self.zone_authority();
        match answer {
            Some(answer) => Answer::new(vec![answer])
                .with_additionals(additional.into_iter().collect())
                .with_authorities(authorities)
                .authoritative(),
            // Known host without this address family.
            None => Answer::no_data()
                .with_authorities(authorities)
                .authoritative(),
        }
    }

    fn ptr_answer(&self, qname: &Name, reverse: &str) -> Option<Answer> {
        let address = ip_from_reverse_name(reverse)?;
        let local_name = self.read().by_ip.get(&address).cloned()?;

        let domain = self.zone.domain();
        let target = if domain.is_empty() {
            local_name
        } else {
            format!("{}.{}", local_name, domain)
        };
        let target = parse_name(&target).ok()?;

        Some(
            Answer::new(vec![Record::from_rdata(
                qname.clone(),
                AUTHORITATIVE_TTL,
                RData::PTR(PTR(target)),
            )])
            .authoritative(),
        )
    }
}

impl HostRegistry for AuthoritativeResolver {
    fn set_domain_name(&self, domain: &str) {
        self.zone.set_domain(domain);
        self.bump_serial();
    }

    fn domain_name(&self) -> String {
        self.zone.domain().to_string()
    }

    fn set_hostname(&self, hostname: &str, ipv4: Ipv4Addr, ipv6: Option<Ipv6Addr>) {
        let mut current = self.hostname.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tables = self.write();
        if let Some(previous) = current.take() {
            tables.remove(&previous.to_lowercase());
        }

        let mut registration = NameRegistration::new(hostname, ipv4);
        registration.ipv6 = ipv6;
        tables.insert(registration);
        *current = Some(hostname.to_string());
        drop(tables);

        self.bump_serial();
        debug!(hostname = %hostname, ipv4 = %ipv4, "Hostname set");
    }

    fn register_host(&self, registration: NameRegistration) {
        debug!(local_name = %registration.local_name, ipv4 = %registration.ipv4, "Registering host");
        self.write().insert(registration);
        self.bump_serial();
    }

    fn unregister_host(&self, local_name: &str) -> bool {
        let removed = self.write().remove(&local_name.to_lowercase());
        if removed {
            self.bump_serial();
        }
        removed
    }

    fn lookup_localname_ip(&self, name: &str) -> Option<IpAddr> {
        self.read()
            .by_local
            .get(&name.to_lowercase())
            .map(|registration| IpAddr::V4(registration.ipv4))
    }
}

#[async_trait]
impl QueryResolver for AuthoritativeResolver {
    async fn query(
        &self,
        request: &Message,
        _ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError> {
        let question = request.queries().first().ok_or(DomainError::MissingQuestion)?;
        let qname = normalize_name(question.name());

        let answer = match question.query_type() {
            qtype @ (RecordType::A | RecordType::AAAA) => self
                .find_host(&qname)
                .map(|host| self.address_answer(question.name(), qtype, &host)),
            RecordType::PTR => self.ptr_answer(question.name(), &qname),
            RecordType::SOA if qname == *self.zone.domain() => self
                .soa_record()
                .map(|soa| Answer::new(vec![soa]).authoritative()),
            _ => None,
        };
        Ok(answer)
    }

    fn name(&self) -> &'static str {
        "authoritative"
    }
}
