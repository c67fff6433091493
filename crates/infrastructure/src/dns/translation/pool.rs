use ipnetwork::Ipv4Network;
use minke_dns_domain::DomainError;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::net::Ipv4Addr;

/// Host offsets handed out by the free-list pool, highest first.
const FREE_LIST_FIRST_HOST: u32 = 254;
const FREE_LIST_LAST_HOST: u32 = 65;

/// Source addresses available on the DNS network.
#[derive(Debug)]
pub enum AddressPool {
    /// The DNS network has at least as many host bits as the home network,
    /// so each home address maps to the DNS address with the same host bits.
    Masked {
        dns: Ipv4Network,
        home: Ipv4Network,
        in_use: FxHashSet<Ipv4Addr>,
    },
    /// Too little room for a direct mapping: hand out hosts from a list.
    FreeList {
        capacity: usize,
        available: VecDeque<Ipv4Addr>,
    },
}

impl AddressPool {
    pub fn for_networks(dns: Ipv4Network, home: Ipv4Network) -> Self {
        let dns_host_bits = 32 - u32::from(dns.prefix());
        let home_host_bits = 32 - u32::from(home.prefix());

        if dns_host_bits >= home_host_bits {
            return Self::Masked {
                dns,
                home,
                in_use: FxHashSet::default(),
            };
        }

        let base = u32::from(dns.network());
        let available: VecDeque<Ipv4Addr> = (FREE_LIST_LAST_HOST..=FREE_LIST_FIRST_HOST)
            .rev()
            .map(|host| Ipv4Addr::from(base + host))
            .filter(|addr| dns.contains(*addr) && *addr != dns.broadcast())
            .collect();

        Self::FreeList {
            capacity: available.len(),
            available,
        }
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Masked { .. })
    }

    pub fn available(&self) -> usize {
        match self {
            Self::Masked { home, in_use, .. } => {
                (home.size() as usize).saturating_sub(in_use.len())
            }
            Self::FreeList { available, .. } => available.len(),
        }
    }

    /// Take an address for `original`. `None` when the pool is exhausted or,
    /// in masked mode, when `original` lies outside the home network.
    pub fn allocate(&mut self, original: Ipv4Addr) -> Option<Ipv4Addr> {
        match self {
            Self::Masked { dns, home, in_use } => {
                if !home.contains(original) {
                    return None;
                }
                let host = u32::from(original) & !u32::from(home.mask());
                let mapped = Ipv4Addr::from(u32::from(dns.network()) | host);
                in_use.insert(mapped).then_some(mapped)
            }
            Self::FreeList { available, .. } => available.pop_front(),
        }
    }

    /// Mark a persisted address as taken again. False if it is not
    /// available (outside the pool or already claimed).
    pub fn claim(&mut self, mapped: Ipv4Addr) -> bool {
        match self {
            Self::Masked { dns, in_use, .. } => dns.contains(mapped) && in_use.insert(mapped),
            Self::FreeList { available, .. } => {
                match available.iter().position(|a| *a == mapped) {
                    Some(index) => available.remove(index).is_some(),
                    None => false,
                }
            }
        }
    }

    pub fn release(&mut self, mapped: Ipv4Addr) -> Result<(), DomainError> {
        let released = match self {
            Self::Masked { in_use, .. } => in_use.remove(&mapped),
            Self::FreeList {
                capacity,
                available,
            } => {
                if available.contains(&mapped) || available.len() >= *capacity {
                    false
                } else {
                    available.push_back(mapped);
                    true
                }
            }
        };

        if released {
            Ok(())
        } else {
            Err(DomainError::InvariantViolation(format!(
                "Releasing address again: {}",
                mapped
            )))
        }
    }
}
