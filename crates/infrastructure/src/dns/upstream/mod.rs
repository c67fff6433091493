mod tcp;
mod timing;
mod udp;

pub use tcp::exchange_tcp;
pub use timing::{TimingEstimator, SAMPLE_COUNT};
pub use udp::UdpExchange;

use crate::dns::translation::{Lease, NetworkAddressTranslator};
use crate::dns::wire::normalize_name;
use crate::dns::zone::LocalZone;
use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use minke_dns_application::ports::{Answer, QueryResolver};
use minke_dns_domain::{DomainError, QueryContext, TransportKind, UpstreamSpec};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Forwards questions to one external resolver.
pub struct UpstreamProxy {
    spec: UpstreamSpec,
    target: SocketAddr,
    timing: TimingEstimator,
    direct: UdpExchange,
    translator: Option<Arc<NetworkAddressTranslator>>,
    zone: Arc<LocalZone>,
}

impl UpstreamProxy {
    /// Binds the shared exchange socket. Translated upstreams fall back to
    /// it whenever no mapped address is available.
    pub async fn start(
        spec: UpstreamSpec,
        zone: Arc<LocalZone>,
        translator: Option<Arc<NetworkAddressTranslator>>,
    ) -> Result<Self, DomainError> {
        let target = SocketAddr::new(spec.address, spec.port);
        let direct = UdpExchange::ephemeral_for(target).await?;
        let translator = if spec.use_address_translation {
            translator
        } else {
            None
        };

        debug!(
            upstream = %spec.identity,
            server = %target,
            translated = translator.is_some(),
            global = spec.global,
            "Upstream started"
        );

        Ok(Self {
            timing: TimingEstimator::new(Duration::from_millis(spec.timeout_ms)),
            spec,
            target,
            direct,
            translator,
            zone,
        })
    }

    pub fn spec(&self) -> &UpstreamSpec {
        &self.spec
    }

    pub fn timing(&self) -> &TimingEstimator {
        &self.timing
    }

    async fn lease_source(&self, origin: IpAddr) -> Option<Lease> {
        let translator = self.translator.as_ref()?;
        match translator.allocate(origin).await {
            Ok(lease) => lease,
            Err(e) => {
                warn!(upstream = %self.spec.identity, origin = %origin, error = %e, "Address translation failed, querying directly");
                None
            }
        }
    }

    async fn forward(
        &self,
        request: &Message,
        ctx: &QueryContext,
        timeout: Duration,
    ) -> Result<Message, DomainError> {
        let lease = self.lease_source(ctx.origin.ip()).await;
        match ctx.transport {
            TransportKind::Tcp => {
                let source = lease.map(|l| IpAddr::V4(l.mapped));
                exchange_tcp(request, self.target, source, timeout).await
            }
            TransportKind::Udp => match lease {
                Some(lease) => lease.exchange.exchange(request, self.target, timeout).await,
                None => self.direct.exchange(request, self.target, timeout).await,
            },
        }
    }
}

#[async_trait]
impl QueryResolver for UpstreamProxy {
    async fn query(
        &self,
        request: &Message,
        ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError> {
        let question = request.queries().first().ok_or(DomainError::MissingQuestion)?;

        if ctx.origin.ip() == self.spec.address {
            debug!(upstream = %self.spec.identity, "Not sending a query back to its origin");
            return Ok(None);
        }

        if self.spec.global {
            let name = normalize_name(question.name());
            if self.zone.contains(&name) {
                debug!(upstream = %self.spec.identity, name = %name, "Local name withheld from public resolver");
                return Ok(None);
            }
        }

        let timeout = self.timing.timeout(ctx.last_resort);
        let started = Instant::now();

        match self.forward(request, ctx, timeout).await {
            Ok(reply) => {
                self.timing.record_success(started.elapsed());
                // NXDOMAIN is handed back so the router can fall back on it.
                if !matches!(
                    reply.response_code(),
                    ResponseCode::NoError | ResponseCode::NXDomain
                ) {
                    debug!(
                        upstream = %self.spec.identity,
                        rcode = ?reply.response_code(),
                        "Upstream declined"
                    );
                    return Ok(None);
                }
                Ok(Some(Answer::from_message(&reply)))
            }
            Err(e) if e.is_timeout() => {
                self.timing.record_failure(timeout);
                debug!(upstream = %self.spec.identity, timeout_ms = timeout.as_millis() as u64, "Upstream timed out");
                Ok(None)
            }
            Err(e) => {
                self.timing.record_failure(started.elapsed());
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        if self.spec.global {
            "global"
        } else {
            "upstream"
        }
    }
}
