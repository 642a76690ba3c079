//! Submission lifecycle of an event.
//!
//! Statuses move forward only: PENDENTE -> ENVIADO -> {PROCESSADO |
//! REJEITADO}, with the single backward edge REJEITADO -> RASCUNHO for the
//! correct-and-resubmit path. PROCESSADO is immutable; every refused
//! transition is reported, never swallowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EsocialEvent, EventStatus};

/// Refused state changes. Recoverable by caller logic, not by retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("evento já processado")]
    AlreadyProcessed,
    #[error("envio já em andamento para o evento")]
    SubmissionInFlight,
    #[error("transição de status inválida: {de} -> {para}")]
    InvalidTransition { de: EventStatus, para: EventStatus },
    #[error("retorno do governo recebido com o evento em {status}")]
    StaleCallback { status: EventStatus },
    #[error("somente eventos rejeitados podem ser corrigidos (status atual: {status})")]
    NotCorrectable { status: EventStatus },
    #[error("evento não pode ser editado em {status}")]
    ImmutableStatus { status: EventStatus },
    #[error("conflito de concorrência ao gravar o evento")]
    VersionConflict,
    #[error("envio cancelado antes do despacho")]
    SubmissionCancelled,
}

/// Verdict carried by the government callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernmentOutcome {
    Accepted,
    Rejected,
}

impl GovernmentOutcome {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accepted" | "aceito" => Some(GovernmentOutcome::Accepted),
            "rejected" | "rejeitado" => Some(GovernmentOutcome::Rejected),
            _ => None,
        }
    }
}

impl EsocialEvent {
    /// PENDENTE -> ENVIADO (or RASCUNHO -> ENVIADO after a correction).
    /// Records the envelope and stamps the submission; the caller must have
    /// revalidated the payload first.
    pub fn iniciar_envio(
        &mut self,
        xml: String,
        agora: DateTime<Utc>,
    ) -> Result<(), ConflictError> {
        match self.status {
            EventStatus::Pending | EventStatus::Draft => {
                self.status = EventStatus::Sent;
                self.data_envio = Some(agora);
                self.xml_payload = Some(xml);
                self.tentativas_envio += 1;
                Ok(())
            }
            EventStatus::Sent => Err(ConflictError::SubmissionInFlight),
            EventStatus::Processed => Err(ConflictError::AlreadyProcessed),
            EventStatus::Rejected => Err(ConflictError::InvalidTransition {
                de: EventStatus::Rejected,
                para: EventStatus::Sent,
            }),
        }
    }

    /// ENVIADO -> PROCESSADO | REJEITADO. A callback landing in any other
    /// status is stale and reported as such — including the race where the
    /// event was already corrected back to RASCUNHO.
    pub fn aplicar_retorno(
        &mut self,
        resultado: GovernmentOutcome,
        mensagem: Option<String>,
        agora: DateTime<Utc>,
    ) -> Result<(), ConflictError> {
        if self.status != EventStatus::Sent {
            return Err(ConflictError::StaleCallback {
                status: self.status,
            });
        }
        self.status = match resultado {
            GovernmentOutcome::Accepted => EventStatus::Processed,
            GovernmentOutcome::Rejected => EventStatus::Rejected,
        };
        self.data_retorno = Some(agora);
        self.mensagem_retorno = mensagem;
        Ok(())
    }

    /// REJEITADO -> RASCUNHO. Clears the submission trail so the corrected
    /// payload must revalidate before the next envio.
    pub fn corrigir(&mut self) -> Result<(), ConflictError> {
        match self.status {
            EventStatus::Rejected => {
                self.status = EventStatus::Draft;
                self.data_envio = None;
                self.data_retorno = None;
                self.mensagem_retorno = None;
                self.xml_payload = None;
                Ok(())
            }
            EventStatus::Processed => Err(ConflictError::AlreadyProcessed),
            status => Err(ConflictError::NotCorrectable { status }),
        }
    }

    /// Payload edits are allowed while the event still belongs to the
    /// employer: RASCUNHO, PENDENTE, REJEITADO. An in-flight envelope
    /// (ENVIADO) must not drift from what the government received.
    pub fn garantir_editavel(&self) -> Result<(), ConflictError> {
        match self.status {
            EventStatus::Processed => Err(ConflictError::AlreadyProcessed),
            EventStatus::Sent => Err(ConflictError::ImmutableStatus {
                status: EventStatus::Sent,
            }),
            _ => Ok(()),
        }
    }

    /// Attachments and cross-references stay writable in every status except
    /// PROCESSADO.
    pub fn garantir_nao_processado(&self) -> Result<(), ConflictError> {
        if self.status == EventStatus::Processed {
            return Err(ConflictError::AlreadyProcessed);
        }
        Ok(())
    }

    pub fn garantir_excluivel(&self) -> Result<(), ConflictError> {
        self.garantir_nao_processado()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esocial::domain::EventType;
    use crate::esocial::payload::{DesligamentoPayload, EventPayload};
    use chrono::NaiveDate;

    fn evento() -> EsocialEvent {
        EsocialEvent::novo(
            EventType::S2299,
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("data válida"),
            EventPayload::Desligamento(DesligamentoPayload {
                cpf: "12345678900".to_string(),
                data_desligamento: NaiveDate::from_ymd_opt(2024, 6, 1).expect("data válida"),
                motivo_desligamento: "PEDIDO_DEMISSAO".to_string(),
                observacao: None,
            }),
        )
    }

    #[test]
    fn caminho_feliz_pendente_enviado_processado() {
        let mut evento = evento();
        assert_eq!(evento.status, EventStatus::Pending);

        evento
            .iniciar_envio("<eSocial/>".to_string(), Utc::now())
            .expect("envio permitido");
        assert_eq!(evento.status, EventStatus::Sent);
        assert!(evento.data_envio.is_some());
        assert_eq!(evento.tentativas_envio, 1);

        evento
            .aplicar_retorno(GovernmentOutcome::Accepted, None, Utc::now())
            .expect("retorno aplicado");
        assert_eq!(evento.status, EventStatus::Processed);
        assert!(evento.data_retorno.is_some());
    }

    #[test]
    fn segundo_envio_conflita() {
        let mut evento = evento();
        evento
            .iniciar_envio("<eSocial/>".to_string(), Utc::now())
            .expect("primeiro envio");
        assert_eq!(
            evento.iniciar_envio("<eSocial/>".to_string(), Utc::now()),
            Err(ConflictError::SubmissionInFlight)
        );
    }

    #[test]
    fn retorno_fora_de_enviado_e_conflito() {
        let mut evento = evento();
        assert_eq!(
            evento.aplicar_retorno(GovernmentOutcome::Accepted, None, Utc::now()),
            Err(ConflictError::StaleCallback {
                status: EventStatus::Pending
            })
        );
    }

    #[test]
    fn correcao_limpa_trilha_de_envio() {
        let mut evento = evento();
        evento
            .iniciar_envio("<eSocial/>".to_string(), Utc::now())
            .expect("envio");
        evento
            .aplicar_retorno(
                GovernmentOutcome::Rejected,
                Some("CPF inválido".to_string()),
                Utc::now(),
            )
            .expect("retorno rejeitado");
        assert_eq!(evento.status, EventStatus::Rejected);
        assert_eq!(evento.mensagem_retorno.as_deref(), Some("CPF inválido"));

        evento.corrigir().expect("correção permitida");
        assert_eq!(evento.status, EventStatus::Draft);
        assert!(evento.data_envio.is_none());
        assert!(evento.data_retorno.is_none());
        assert!(evento.mensagem_retorno.is_none());
        assert!(evento.xml_payload.is_none());
    }

    #[test]
    fn processado_e_imutavel() {
        let mut evento = evento();
        evento
            .iniciar_envio("<eSocial/>".to_string(), Utc::now())
            .expect("envio");
        evento
            .aplicar_retorno(GovernmentOutcome::Accepted, None, Utc::now())
            .expect("retorno");

        assert_eq!(evento.corrigir(), Err(ConflictError::AlreadyProcessed));
        assert_eq!(
            evento.garantir_editavel(),
            Err(ConflictError::AlreadyProcessed)
        );
        assert_eq!(
            evento.garantir_nao_processado(),
            Err(ConflictError::AlreadyProcessed)
        );
        assert_eq!(
            evento.garantir_excluivel(),
            Err(ConflictError::AlreadyProcessed)
        );
    }

    #[test]
    fn correcao_exige_rejeicao_previa() {
        let mut evento = evento();
        assert_eq!(
            evento.corrigir(),
            Err(ConflictError::NotCorrectable {
                status: EventStatus::Pending
            })
        );
    }
}
