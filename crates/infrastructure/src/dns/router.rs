//! Ordered resolver list and the two query strategies.
//!
//! Built-in resolvers sit at negative priorities ahead of every upstream.
//! A query works on a snapshot of the list, so entries added, removed or
//! reordered while it runs never affect it.

use crate::dns::cache::AnswerCache;
use crate::dns::resolver::{
    AuthoritativeResolver, MulticastBridge, Resolver, ResolverEntry, ReverseMapper,
};
use crate::dns::translation::NetworkAddressTranslator;
use crate::dns::upstream::UpstreamProxy;
use crate::dns::zone::LocalZone;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use hickory_proto::op::Message;
use minke_dns_application::ports::{Answer, UpstreamRegistry};
use minke_dns_domain::config::QueryStrategy;
use minke_dns_domain::{
    DomainError, QueryContext, UpstreamHandle, UpstreamSpec, SYSTEM_PRIORITY_OFFSET,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const AUTHORITATIVE_PRIORITY: i64 = -4;
const MULTICAST_PRIORITY: i64 = -3;
const REVERSE_MAPPER_PRIORITY: i64 = -2;
const CACHE_PRIORITY: i64 = -1;

/// Collaborators the router installs as built-in entries.
pub struct BuiltinResolvers {
    pub authoritative: Arc<AuthoritativeResolver>,
    pub multicast: Arc<MulticastBridge>,
    pub cache: Arc<AnswerCache>,
    pub translator: Option<Arc<NetworkAddressTranslator>>,
    pub zone: Arc<LocalZone>,
}

pub struct QueryRouter {
    entries: ArcSwap<Vec<ResolverEntry>>,
    /// Serializes list mutations. Never held across an await.
    mutation: Mutex<()>,
    cache: Arc<AnswerCache>,
    translator: Option<Arc<NetworkAddressTranslator>>,
    zone: Arc<LocalZone>,
    strategy: QueryStrategy,
}

impl QueryRouter {
    pub fn new(strategy: QueryStrategy, builtins: BuiltinResolvers) -> Arc<Self> {
        Arc::new_cyclic(|router| {
            let mut entries = vec![
                ResolverEntry::local(
                    "authoritative",
                    Resolver::Authoritative(builtins.authoritative),
                    AUTHORITATIVE_PRIORITY,
                ),
                ResolverEntry::local(
                    "multicast",
                    Resolver::Multicast(builtins.multicast),
                    MULTICAST_PRIORITY,
                ),
            ];
            if let Some(translator) = &builtins.translator {
                entries.push(ResolverEntry::local(
                    "reverse-mapper",
                    Resolver::ReverseMapper(Arc::new(ReverseMapper::new(
                        Arc::clone(translator),
                        router.clone(),
                    ))),
                    REVERSE_MAPPER_PRIORITY,
                ));
            }
            entries.push(ResolverEntry::local(
                "cache",
                Resolver::Cache(Arc::clone(&builtins.cache)),
                CACHE_PRIORITY,
            ));

            Self {
                entries: ArcSwap::from_pointee(entries),
                mutation: Mutex::new(()),
                cache: builtins.cache,
                translator: builtins.translator,
                zone: builtins.zone,
                strategy,
            }
        })
    }

    pub fn strategy(&self) -> QueryStrategy {
        self.strategy
    }

    pub fn cache(&self) -> &Arc<AnswerCache> {
        &self.cache
    }

    /// Snapshot of the current entries, priority-sorted.
    pub fn entries(&self) -> Arc<Vec<ResolverEntry>> {
        self.entries.load_full()
    }

    pub fn upstream_identities(&self) -> Vec<String> {
        self.entries
            .load()
            .iter()
            .filter(|entry| !entry.is_local)
            .map(|entry| entry.identity.clone())
            .collect()
    }

    /// Replace the list under the mutation lock. Returns what `change`
    /// returned; the cache is flushed when the upstream order moved.
    fn mutate<R>(&self, change: impl FnOnce(&mut Vec<ResolverEntry>) -> R) -> R {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.entries.load_full();
        let before = upstream_order(&current);

        let mut next = current.as_ref().clone();
        let result = change(&mut next);
        next.sort_by_key(|entry| entry.priority);

        let changed = upstream_order(&next) != before;
        self.entries.store(Arc::new(next));
        if changed {
            self.cache.flush();
        }
        result
    }

    /// Follow an external ordering feed until its sender goes away.
    pub fn watch_ordering(
        self: &Arc<Self>,
        mut ordering: watch::Receiver<Vec<String>>,
    ) -> JoinHandle<()> {
        let router = Arc::downgrade(self);
        tokio::spawn(async move {
            while ordering.changed().await.is_ok() {
                let identities = ordering.borrow_and_update().clone();
                let Some(router) = router.upgrade() else {
                    break;
                };
                router.reorder(&identities);
            }
            debug!("Ordering feed closed");
        })
    }

    /// Resolve one question. A question nobody answers becomes NXDOMAIN.
    ///
    /// An upstream NXDOMAIN does not end the search. It is adopted only when
    /// no later resolver answers, so it still reaches the negative cache.
    pub async fn resolve(
        &self,
        request: &Message,
        ctx: &QueryContext,
    ) -> Result<Answer, DomainError> {
        if request.queries().is_empty() {
            return Err(DomainError::MissingQuestion);
        }

        let entries = self.entries.load_full();
        let answer = match self.strategy {
            QueryStrategy::Sequential => self.resolve_sequential(&entries, request, ctx).await,
            QueryStrategy::Parallel => self.resolve_parallel(&entries, request, ctx).await,
        };

        Ok(answer.unwrap_or_else(|| {
            debug!(question = ?request.queries().first().map(|q| q.name().to_string()), "No resolver answered");
            Answer::nx_domain()
        }))
    }

    async fn resolve_sequential(
        &self,
        entries: &[ResolverEntry],
        request: &Message,
        ctx: &QueryContext,
    ) -> Option<Answer> {
        let last = entries.len().saturating_sub(1);
        let mut fallback: Option<(&ResolverEntry, Answer)> = None;
        for (index, entry) in entries.iter().enumerate() {
            let ctx = ctx.with_last_resort(index == last);
            match entry.resolver.query(request, &ctx).await {
                Ok(Some(answer)) if !entry.is_local && answer.is_nx_domain() => {
                    if fallback.is_none() {
                        fallback = Some((entry, answer));
                    }
                }
                Ok(Some(answer)) => {
                    self.adopt(entry, request, &answer);
                    return Some(answer);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(resolver = %entry.identity, error = %e, "Resolver failed");
                }
            }
        }

        let (entry, answer) = fallback?;
        self.adopt(entry, request, &answer);
        Some(answer)
    }

    async fn resolve_parallel(
        &self,
        entries: &[ResolverEntry],
        request: &Message,
        ctx: &QueryContext,
    ) -> Option<Answer> {
        let local_count = entries.iter().take_while(|entry| entry.is_local).count();
        let (local, remote) = entries.split_at(local_count);

        if let Some(answer) = self.resolve_sequential(local, request, ctx).await {
            return Some(answer);
        }
        if remote.is_empty() {
            return None;
        }

        let shared = Arc::new(request.clone());
        let last = remote.len() - 1;
        let mut pending = FuturesUnordered::new();
        for (slot, entry) in remote.iter().enumerate() {
            let resolver = entry.resolver.clone();
            let request = Arc::clone(&shared);
            let ctx = ctx.with_last_resort(slot == last);
            let task = tokio::spawn(async move { resolver.query(&request, &ctx).await });
            pending.push(async move { (slot, task.await) });
        }

        let mut outcomes: Vec<Option<Option<Answer>>> = (0..remote.len()).map(|_| None).collect();
        while let Some((slot, joined)) = pending.next().await {
            let entry = &remote[slot];
            let outcome = match joined {
                Ok(Ok(answer)) => answer,
                Ok(Err(e)) => {
                    warn!(resolver = %entry.identity, error = %e, "Resolver failed");
                    None
                }
                Err(e) => {
                    error!(resolver = %entry.identity, error = %e, "Resolver task aborted");
                    None
                }
            };
            outcomes[slot] = Some(outcome);

            if let Some(winner) = first_settled_success(&outcomes) {
                let answer = outcomes[winner].take().flatten()?;
                self.adopt(&remote[winner], request, &answer);
                // Remaining tasks are detached; their results are dropped.
                return Some(answer);
            }
        }

        // Every slot has settled without a positive answer.
        let slot = outcomes
            .iter()
            .position(|outcome| matches!(outcome, Some(Some(answer)) if answer.is_nx_domain()))?;
        let answer = outcomes[slot].take().flatten()?;
        self.adopt(&remote[slot], request, &answer);
        Some(answer)
    }

    fn adopt(&self, entry: &ResolverEntry, request: &Message, answer: &Answer) {
        debug!(
            resolver = %entry.identity,
            kind = entry.resolver.kind(),
            answers = answer.answers.len(),
            rcode = ?answer.response_code,
            "Answer adopted"
        );
        if entry.cacheable {
            self.cache.add(request, answer);
        }
    }
}

/// Lowest slot holding an answer, once every slot before it has failed.
/// NXDOMAIN counts as a failure here.
fn first_settled_success(outcomes: &[Option<Option<Answer>>]) -> Option<usize> {
    for (slot, outcome) in outcomes.iter().enumerate() {
        match outcome {
            None => return None,
            Some(None) => continue,
            Some(Some(answer)) if answer.is_nx_domain() => continue,
            Some(Some(_)) => return Some(slot),
        }
    }
    None
}

fn upstream_order(entries: &[ResolverEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|entry| !entry.is_local)
        .map(|entry| entry.identity.as_str())
        .collect()
}

#[async_trait]
impl UpstreamRegistry for QueryRouter {
    async fn add_dns_server(&self, spec: UpstreamSpec) -> Result<UpstreamHandle, DomainError> {
        let translator = if spec.use_address_translation {
            self.translator.clone()
        } else {
            None
        };
        let proxy = Arc::new(UpstreamProxy::start(spec, Arc::clone(&self.zone), translator).await?);
        let entry = ResolverEntry::upstream(proxy);
        let handle = UpstreamHandle {
            identity: entry.identity.clone(),
        };

        info!(upstream = %entry.identity, priority = entry.priority, "DNS server added");
        self.mutate(|entries| {
            entries.retain(|existing| existing.is_local || existing.identity != entry.identity);
            entries.push(entry);
        });
        self.cache.flush();
        Ok(handle)
    }

    async fn remove_dns_server(&self, handle: &UpstreamHandle) -> Result<(), DomainError> {
        let removed = self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|entry| entry.is_local || entry.identity != handle.identity);
            before != entries.len()
        });

        if !removed {
            return Err(DomainError::UpstreamNotFound(handle.identity.clone()));
        }
        info!(upstream = %handle, "DNS server removed");
        Ok(())
    }

    fn reorder(&self, identities: &[String]) {
        self.mutate(|entries| {
            for entry in entries.iter_mut().filter(|entry| {
                !entry.is_local && entry.resolver.as_upstream().is_some_and(|p| !p.spec().global)
            }) {
                if let Some(position) = identities.iter().position(|id| *id == entry.identity) {
                    entry.priority = SYSTEM_PRIORITY_OFFSET + position as i64;
                }
            }
        });
        debug!(order = ?self.upstream_identities(), "Resolvers reordered");
    }
}
