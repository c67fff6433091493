mod authoritative;
mod multicast;
mod reverse_mapper;

pub use authoritative::AuthoritativeResolver;
pub use multicast::{InMemoryMdnsHosts, MulticastBridge};
pub use reverse_mapper::ReverseMapper;

use crate::dns::cache::AnswerCache;
use crate::dns::upstream::UpstreamProxy;
use hickory_proto::op::Message;
use minke_dns_application::ports::{Answer, QueryResolver};
use minke_dns_domain::{DomainError, QueryContext};
use std::sync::Arc;

/// Every kind of resolver the router can hold.
#[derive(Clone)]
pub enum Resolver {
    Authoritative(Arc<AuthoritativeResolver>),
    Multicast(Arc<MulticastBridge>),
    ReverseMapper(Arc<ReverseMapper>),
    Cache(Arc<AnswerCache>),
    Upstream(Arc<UpstreamProxy>),
}

impl Resolver {
    fn inner(&self) -> &dyn QueryResolver {
        match self {
            Self::Authoritative(r) => r.as_ref(),
            Self::Multicast(r) => r.as_ref(),
            Self::ReverseMapper(r) => r.as_ref(),
            Self::Cache(r) => r.as_ref(),
            Self::Upstream(r) => r.as_ref(),
        }
    }

    pub async fn query(
        &self,
        request: &Message,
        ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError> {
        self.inner().query(request, ctx).await
    }

    pub fn kind(&self) -> &'static str {
        self.inner().name()
    }

    pub fn as_upstream(&self) -> Option<&Arc<UpstreamProxy>> {
        match self {
            Self::Upstream(proxy) => Some(proxy),
            _ => None,
        }
    }
}

/// A resolver in the router's list.
#[derive(Clone)]
pub struct ResolverEntry {
    pub identity: String,
    pub resolver: Resolver,
    /// Answers from this entry go into the answer cache.
    pub cacheable: bool,
    /// Answers without leaving the box; never raced in parallel.
    pub is_local: bool,
    pub priority: i64,
}

impl ResolverEntry {
    pub fn local(identity: &str, resolver: Resolver, priority: i64) -> Self {
        Self {
            identity: identity.to_string(),
            resolver,
            cacheable: false,
            is_local: true,
            priority,
        }
    }

    pub fn upstream(proxy: Arc<UpstreamProxy>) -> Self {
        let spec = proxy.spec();
        Self {
            identity: spec.identity.clone(),
            priority: spec.priority,
            resolver: Resolver::Upstream(Arc::clone(&proxy)),
            cacheable: true,
            is_local: false,
        }
    }
}
