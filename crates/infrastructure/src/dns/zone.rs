use arc_swap::ArcSwap;
use std::sync::Arc;

/// The local domain, shared between the authoritative resolver and the
/// public upstreams that must never see local names.
pub struct LocalZone {
    domain: ArcSwap<String>,
}

impl LocalZone {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: ArcSwap::from_pointee(domain.to_ascii_lowercase()),
        }
    }

    pub fn domain(&self) -> Arc<String> {
        self.domain.load_full()
    }

    pub fn set_domain(&self, domain: &str) {
        self.domain.store(Arc::new(domain.to_ascii_lowercase()));
    }

    /// True for `local`, anything under it, and the configured domain.
    pub fn contains(&self, name: &str) -> bool {
        if name == "local" || name.ends_with(".local") {
            return true;
        }
        let domain = self.domain.load();
        !domain.is_empty()
            && (name == domain.as_str()
                || name
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }
}

impl Default for LocalZone {
    fn default() -> Self {
        Self::new("")
    }
}
