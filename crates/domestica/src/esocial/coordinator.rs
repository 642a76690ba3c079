//! Drives submissions against the government channel.
//!
//! The coordinator owns the outward-facing delivery semantics: one in-flight
//! attempt per event, cancellation only while the attempt is still queued,
//! bounded retries with exponential backoff on transient failures, and a
//! per-attempt timeout. A validation failure never reaches this layer; the
//! service fails fast before reserving a slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};

use super::channel::{EnvelopeEnvio, GovernmentChannel, ReciboEnvio, TransportError};
use super::domain::EventId;
use super::lifecycle::ConflictError;

/// Retry and timeout dials, normally derived from
/// [`crate::config::EsocialConfig`].
#[derive(Debug, Clone)]
pub struct SubmissionPolicy {
    pub max_tentativas: u32,
    pub timeout: Duration,
    pub backoff_base: Duration,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            max_tentativas: 3,
            timeout: Duration::from_secs(5),
            backoff_base: Duration::from_millis(250),
        }
    }
}

/// Raised once every retry of a submission attempt failed. The event stays
/// ENVIADO: a transport failure is never a government rejection.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("canal do eSocial indisponível após {tentativas} tentativas: {origem}")]
    RetriesExhausted {
        tentativas: u32,
        #[source]
        origem: TransportError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EstadoEnvio {
    Aguardando,
    Cancelado,
    Despachado,
}

/// Receipt for a reserved submission slot; hand it back via `liberar`.
#[derive(Debug)]
pub struct SubmissionTicket {
    id: EventId,
}

pub struct SubmissionCoordinator<C> {
    canal: Arc<C>,
    politica: SubmissionPolicy,
    em_andamento: Mutex<HashMap<EventId, EstadoEnvio>>,
}

impl<C> SubmissionCoordinator<C>
where
    C: GovernmentChannel,
{
    pub fn new(canal: Arc<C>, politica: SubmissionPolicy) -> Self {
        Self {
            canal,
            politica,
            em_andamento: Mutex::new(HashMap::new()),
        }
    }

    /// Claim the single submission slot for this event. A second caller gets
    /// the conflict immediately, before any state or network effect.
    pub fn reservar(&self, id: EventId) -> Result<SubmissionTicket, ConflictError> {
        let mut guarda = self.em_andamento.lock().expect("mutex de envios envenenado");
        if guarda.contains_key(&id) {
            return Err(ConflictError::SubmissionInFlight);
        }
        guarda.insert(id, EstadoEnvio::Aguardando);
        Ok(SubmissionTicket { id })
    }

    /// Cancel an attempt that has not been dispatched yet. Returns whether
    /// the cancellation landed; once dispatched the attempt runs to
    /// completion or timeout.
    pub fn cancelar_pendente(&self, id: &EventId) -> bool {
        let mut guarda = self.em_andamento.lock().expect("mutex de envios envenenado");
        match guarda.get_mut(id) {
            Some(estado @ EstadoEnvio::Aguardando) => {
                *estado = EstadoEnvio::Cancelado;
                true
            }
            _ => false,
        }
    }

    /// Point of no return: after this the attempt can no longer be cancelled.
    /// Called before any event mutation so a landed cancellation leaves no
    /// trace.
    pub fn confirmar_despacho(&self, ticket: &SubmissionTicket) -> Result<(), ConflictError> {
        let mut guarda = self.em_andamento.lock().expect("mutex de envios envenenado");
        match guarda.get_mut(&ticket.id) {
            Some(EstadoEnvio::Cancelado) => Err(ConflictError::SubmissionCancelled),
            Some(estado) => {
                *estado = EstadoEnvio::Despachado;
                Ok(())
            }
            None => Err(ConflictError::SubmissionCancelled),
        }
    }

    pub fn liberar(&self, ticket: SubmissionTicket) {
        let mut guarda = self.em_andamento.lock().expect("mutex de envios envenenado");
        guarda.remove(&ticket.id);
    }

    /// Deliver the envelope, retrying transient failures with exponential
    /// backoff until the policy's attempt limit runs out.
    pub async fn despachar(
        &self,
        envelope: EnvelopeEnvio,
    ) -> Result<ReciboEnvio, SubmissionError> {
        let mut tentativa = 0u32;
        loop {
            tentativa += 1;
            let resultado =
                tokio::time::timeout(self.politica.timeout, self.canal.enviar(envelope.clone()))
                    .await;

            let origem = match resultado {
                Ok(Ok(recibo)) => {
                    info!(
                        evento = %envelope.evento_id,
                        protocolo = %recibo.protocolo,
                        tentativa,
                        "evento entregue ao canal do eSocial"
                    );
                    return Ok(recibo);
                }
                Ok(Err(erro)) => erro,
                Err(_) => TransportError::Timeout,
            };

            if tentativa >= self.politica.max_tentativas {
                return Err(SubmissionError::RetriesExhausted {
                    tentativas: tentativa,
                    origem,
                });
            }

            let espera = self.politica.backoff_base * 2u32.pow(tentativa - 1);
            warn!(
                evento = %envelope.evento_id,
                tentativa,
                erro = %origem,
                "falha transitória no envio, aguardando nova tentativa"
            );
            tokio::time::sleep(espera).await;
        }
    }
}
