use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::EventId;

/// Envelope handed to the government channel for one submission attempt.
///
/// The idempotency key is `eventId:tentativa`, so a retried delivery of the
/// same attempt is deduplicated on the far side and a duplicate response
/// cannot double-apply.
#[derive(Debug, Clone)]
pub struct EnvelopeEnvio {
    pub evento_id: EventId,
    pub chave_idempotencia: String,
    pub xml: String,
}

/// Delivery receipt issued by the channel. The verdict itself arrives later
/// through the asynchronous callback.
#[derive(Debug, Clone)]
pub struct ReciboEnvio {
    pub protocolo: String,
    pub recebido_em: DateTime<Utc>,
}

/// Transport-level failures. Retryable; never a government rejection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("tempo de resposta do canal esgotado")]
    Timeout,
    #[error("canal do eSocial indisponível: {0}")]
    Unavailable(String),
}

/// Narrow interface over the government webservice. The real SOAP transport
/// lives outside this crate; tests and the demo plug in fakes.
#[async_trait]
pub trait GovernmentChannel: Send + Sync {
    async fn enviar(&self, envelope: EnvelopeEnvio) -> Result<ReciboEnvio, TransportError>;
}
