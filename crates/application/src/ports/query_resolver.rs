use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::Record;
use minke_dns_domain::{DomainError, QueryContext};

/// What a resolver produced for one question. Built once, never mutated
/// after it leaves the resolver.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
    pub authoritative: bool,
    pub truncated: bool,
    pub response_code: ResponseCode,
}

impl Answer {
    pub fn new(answers: Vec<Record>) -> Self {
        Self {
            answers,
            authorities: vec![],
            additionals: vec![],
            authoritative: false,
            truncated: false,
            response_code: ResponseCode::NoError,
        }
    }

    /// An empty NOERROR answer: the name is known but holds nothing of the asked type.
    pub fn no_data() -> Self {
        Self::new(vec![])
    }

    pub fn nx_domain() -> Self {
        Self {
            response_code: ResponseCode::NXDomain,
            ..Self::new(vec![])
        }
    }

    pub fn is_nx_domain(&self) -> bool {
        self.response_code == ResponseCode::NXDomain
    }

    pub fn authoritative(mut self) -> Self {
        self.authoritative = true;
        self
    }

    pub fn with_authorities(mut self, authorities: Vec<Record>) -> Self {
        self.authorities = authorities;
        self
    }

    pub fn with_additionals(mut self, additionals: Vec<Record>) -> Self {
        self.additionals = additionals;
        self
    }

    /// Lift the sections of an upstream reply.
    pub fn from_message(message: &Message) -> Self {
        Self {
            answers: message.answers().to_vec(),
            authorities: message.name_servers().to_vec(),
            additionals: message.additionals().to_vec(),
            authoritative: message.authoritative(),
            truncated: message.truncated(),
            response_code: message.response_code(),
        }
    }
}

#[async_trait]
pub trait QueryResolver: Send + Sync {
    /// `Ok(Some(_))` means the resolver handled the question and the router
    /// stops looking; `Ok(None)` passes it on.
    async fn query(
        &self,
        request: &Message,
        ctx: &QueryContext,
    ) -> Result<Option<Answer>, DomainError>;

    fn name(&self) -> &'static str;
}
