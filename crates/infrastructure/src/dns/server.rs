use crate::dns::router::QueryRouter;
use crate::dns::wire;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use minke_dns_domain::{DomainError, QueryContext, TransportKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest UDP reply sent before falling back to a truncated answer.
const MAX_UDP_REPLY_SIZE: usize = 4096;

/// Turns one inbound packet into one reply packet. Never fails: anything
/// that goes wrong becomes SERVFAIL.
pub struct DnsRequestHandler {
    router: Arc<QueryRouter>,
}

impl DnsRequestHandler {
    pub fn new(router: Arc<QueryRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<QueryRouter> {
        &self.router
    }

    pub async fn handle_packet(&self, bytes: &[u8], ctx: QueryContext) -> Vec<u8> {
        match self.try_handle(bytes, ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(client = %ctx.origin, protocol = %ctx.transport, error = %e, "Query failed, answering SERVFAIL");
                wire::servfail_for_raw(bytes)
            }
        }
    }

    async fn try_handle(&self, bytes: &[u8], ctx: QueryContext) -> Result<Vec<u8>, DomainError> {
        if bytes.len() < 2 {
            return Err(DomainError::MalformedPacket(format!(
                "{} byte packet",
                bytes.len()
            )));
        }

        let request = wire::decode(bytes)?;
        if request.message_type() != MessageType::Query {
            return Err(DomainError::MalformedPacket(
                "response received on query port".to_string(),
            ));
        }
        let question = request
            .queries()
            .first()
            .ok_or(DomainError::MissingQuestion)?;

        debug!(
            client = %ctx.origin,
            protocol = %ctx.transport,
            name = %question.name(),
            record_type = ?question.query_type(),
            "DNS query received"
        );

        let answer = self.router.resolve(&request, &ctx).await?;

        let mut response = wire::response_for(&request);
        wire::apply_answer(&mut response, &answer);
        let encoded = wire::encode(&response)?;

        if ctx.transport == TransportKind::Udp && encoded.len() > MAX_UDP_REPLY_SIZE {
            debug!(bytes = encoded.len(), "Reply too large for UDP, truncating");
            return wire::encode(&truncated_reply(&request, answer.response_code));
        }
        Ok(encoded)
    }
}

fn truncated_reply(request: &Message, response_code: ResponseCode) -> Message {
    let mut response = wire::response_for(request);
    response.set_truncated(true);
    response.set_response_code(response_code);
    response
}
