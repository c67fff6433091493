use crate::dns::router::QueryRouter;
use crate::dns::translation::NetworkAddressTranslator;
use crate::dns::wire::{ip_from_reverse_name, normalize_name, parse_name, reverse_name_for};
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, Query};
use hickory_proto::rr::{Name, Record, RecordType};
use minke_dns_application::ports::{Answer, QueryResolver};
use minke_dns_domain::{DomainError, QueryContext};
use std::net::IpAddr;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Turns PTR questions for translated addresses back into questions for
/// the original client address and re-enters the router with them.
pub struct ReverseMapper {
    translator: Arc<NetworkAddressTranslator>,
    router: Weak<QueryRouter>,
}

impl ReverseMapper {
    pub fn new(translator: Arc<NetworkAddressTranslator>, router: Weak<QueryRouter>) -> Self {
        Self { translator, router }
    }
}

fn rename(records: &[Record], from: &Name, to: &Name) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            if record.name() == from {
                Record::from_rdata(to.clone(), record.ttl(), record.data().clone())
            } else {
                record.clone()
            }
        })
        .collect()
}

#[async_trait]
impl QueryResolver for ReverseMapper {
    async fn query(
        &self,
        request: &Message,
        ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError> {
        let question = request.queries().first().ok_or(DomainError::MissingQuestion)?;
        if question.query_type() != RecordType::PTR {
            return Ok(None);
        }

        let Some(IpAddr::V4(mapped)) = ip_from_reverse_name(&normalize_name(question.name()))
        else {
            return Ok(None);
        };
        let Some(original) = self.translator.translate_dns_network_address(mapped) else {
            return Ok(None);
        };
        if original == mapped {
            return Ok(None);
        }
        let Some(router) = self.router.upgrade() else {
            return Ok(None);
        };

        let original_name = parse_name(&reverse_name_for(IpAddr::V4(original)))?;
        debug!(mapped = %mapped, original = %original, "Reverse lookup of translated address");

        let mut rewritten = Message::new(request.id(), MessageType::Query, request.op_code());
        rewritten.set_recursion_desired(request.recursion_desired());
        rewritten.add_query(Query::query(original_name.clone(), RecordType::PTR));

        let answer = router.resolve(&rewritten, ctx).await?;
        if answer.is_nx_domain() {
            debug!(original = %original, "Original address unknown, passing the question on");
            return Ok(None);
        }
        let asked = question.name();

        Ok(Some(Answer {
            answers: rename(&answer.answers, &original_name, asked),
            authorities: rename(&answer.authorities, &original_name, asked),
            additionals: rename(&answer.additionals, &original_name, asked),
            ..answer
        }))
    }

    fn name(&self) -> &'static str {
        "reverse-mapper"
    }
}
