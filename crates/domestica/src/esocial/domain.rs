use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::EventPayload;

/// Identifier wrapper for eSocial events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn novo() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for event attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnexoId(pub Uuid);

impl AnexoId {
    pub fn novo() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AnexoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of event type codes the household-employer module reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    S1200,
    S1202,
    S1207,
    S1210,
    S2200,
    S2205,
    S2206,
    S2210,
    S2230,
    S2240,
    S2250,
    S2299,
    S2300,
    S2399,
    S2400,
    S3000,
}

impl EventType {
    pub const TODOS: [EventType; 16] = [
        EventType::S1200,
        EventType::S1202,
        EventType::S1207,
        EventType::S1210,
        EventType::S2200,
        EventType::S2205,
        EventType::S2206,
        EventType::S2210,
        EventType::S2230,
        EventType::S2240,
        EventType::S2250,
        EventType::S2299,
        EventType::S2300,
        EventType::S2399,
        EventType::S2400,
        EventType::S3000,
    ];

    pub const fn codigo(self) -> &'static str {
        match self {
            EventType::S1200 => "S1200",
            EventType::S1202 => "S1202",
            EventType::S1207 => "S1207",
            EventType::S1210 => "S1210",
            EventType::S2200 => "S2200",
            EventType::S2205 => "S2205",
            EventType::S2206 => "S2206",
            EventType::S2210 => "S2210",
            EventType::S2230 => "S2230",
            EventType::S2240 => "S2240",
            EventType::S2250 => "S2250",
            EventType::S2299 => "S2299",
            EventType::S2300 => "S2300",
            EventType::S2399 => "S2399",
            EventType::S2400 => "S2400",
            EventType::S3000 => "S3000",
        }
    }

    pub const fn descricao(self) -> &'static str {
        match self {
            EventType::S1200 => "Remuneração de Trabalhador",
            EventType::S1202 => "Remuneração de Servidor",
            EventType::S1207 => "Benefícios - Entes Públicos",
            EventType::S1210 => "Pagamentos de Rendimentos do Trabalho",
            EventType::S2200 => "Cadastramento Inicial do Vínculo",
            EventType::S2205 => "Alteração de Dados Cadastrais do Trabalhador",
            EventType::S2206 => "Alteração de Contrato de Trabalho",
            EventType::S2210 => "Comunicação de Acidente de Trabalho",
            EventType::S2230 => "Afastamento Temporário",
            EventType::S2240 => "Condições Ambientais do Trabalho",
            EventType::S2250 => "Aviso Prévio",
            EventType::S2299 => "Desligamento",
            EventType::S2300 => "Trabalhador Sem Vínculo - Início",
            EventType::S2399 => "Trabalhador Sem Vínculo - Término",
            EventType::S2400 => "Cadastro de Beneficiário - Entes Públicos",
            EventType::S3000 => "Exclusão de Eventos",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalizado = raw.trim().to_ascii_uppercase().replace('-', "");
        Self::TODOS
            .into_iter()
            .find(|tipo| tipo.codigo() == normalizado)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codigo())
    }
}

/// Submission lifecycle status, persisted with the labels the legacy system
/// already stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "RASCUNHO")]
    Draft,
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "ENVIADO")]
    Sent,
    #[serde(rename = "PROCESSADO")]
    Processed,
    #[serde(rename = "REJEITADO")]
    Rejected,
}

impl EventStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EventStatus::Draft => "RASCUNHO",
            EventStatus::Pending => "PENDENTE",
            EventStatus::Sent => "ENVIADO",
            EventStatus::Processed => "PROCESSADO",
            EventStatus::Rejected => "REJEITADO",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RASCUNHO" => Some(EventStatus::Draft),
            "PENDENTE" => Some(EventStatus::Pending),
            "ENVIADO" => Some(EventStatus::Sent),
            "PROCESSADO" => Some(EventStatus::Processed),
            "REJEITADO" => Some(EventStatus::Rejected),
            _ => None,
        }
    }

    /// PROCESSADO is the only hard-terminal status; REJEITADO still admits
    /// the correction path back to RASCUNHO.
    pub const fn is_terminal(self) -> bool {
        matches!(self, EventStatus::Processed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// File attached to an event. Owned by the event; removed with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anexo {
    pub id: AnexoId,
    pub nome: String,
    pub tipo: String,
    pub tamanho: u64,
    pub data: DateTime<Utc>,
    pub url: String,
}

/// Non-owning references an event may carry, one per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    Alerta,
    TimeRecord,
    Documento,
}

impl LinkKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "alerta" | "alert" => Some(LinkKind::Alerta),
            "timeRecord" | "ponto" => Some(LinkKind::TimeRecord),
            "documento" | "document" => Some(LinkKind::Documento),
            _ => None,
        }
    }
}

/// A labor-compliance event reported to the government channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EsocialEvent {
    pub id: EventId,
    pub tipo: EventType,
    pub data_evento: NaiveDate,
    pub payload: EventPayload,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_envio: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_retorno: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensagem_retorno: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_payload: Option<String>,
    pub tentativas_envio: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerta_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub anexos: Vec<Anexo>,
}

impl EsocialEvent {
    /// An event only materializes after its payload validated, so it is born
    /// PENDENTE; RASCUNHO is reachable through the correction path alone.
    pub fn novo(tipo: EventType, data_evento: NaiveDate, payload: EventPayload) -> Self {
        Self {
            id: EventId::novo(),
            tipo,
            data_evento,
            payload,
            status: EventStatus::Pending,
            data_envio: None,
            data_retorno: None,
            mensagem_retorno: None,
            xml_payload: None,
            tentativas_envio: 0,
            alerta_id: None,
            time_record_id: None,
            document_id: None,
            anexos: Vec::new(),
        }
    }

    pub fn referencia(&self, kind: LinkKind) -> Option<&str> {
        match kind {
            LinkKind::Alerta => self.alerta_id.as_deref(),
            LinkKind::TimeRecord => self.time_record_id.as_deref(),
            LinkKind::Documento => self.document_id.as_deref(),
        }
    }

    /// Re-linking the same kind overwrites the previous target.
    pub fn definir_referencia(&mut self, kind: LinkKind, alvo: Option<String>) {
        match kind {
            LinkKind::Alerta => self.alerta_id = alvo,
            LinkKind::TimeRecord => self.time_record_id = alvo,
            LinkKind::Documento => self.document_id = alvo,
        }
    }

    pub fn resumo(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            tipo: self.tipo,
            descricao: self.tipo.descricao(),
            data_evento: self.data_evento,
            status: self.status,
            total_anexos: self.anexos.len(),
            mensagem_retorno: self.mensagem_retorno.clone(),
        }
    }
}

/// Condensed listing view for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: EventId,
    pub tipo: EventType,
    pub descricao: &'static str,
    pub data_evento: NaiveDate,
    pub status: EventStatus,
    pub total_anexos: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensagem_retorno: Option<String>,
}

/// Listing filter; every populated field must match.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub tipo: Option<EventType>,
    pub status: Option<EventStatus>,
    pub periodo_inicio: Option<NaiveDate>,
    pub periodo_fim: Option<NaiveDate>,
}

impl EventFilter {
    pub fn aceita(&self, evento: &EsocialEvent) -> bool {
        if self.tipo.is_some_and(|tipo| tipo != evento.tipo) {
            return false;
        }
        if self.status.is_some_and(|status| status != evento.status) {
            return false;
        }
        if self.periodo_inicio.is_some_and(|inicio| evento.data_evento < inicio) {
            return false;
        }
        if self.periodo_fim.is_some_and(|fim| evento.data_evento > fim) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aceita_codigo_com_hifen() {
        assert_eq!(EventType::parse("S-2200"), Some(EventType::S2200));
        assert_eq!(EventType::parse(" s2299 "), Some(EventType::S2299));
        assert_eq!(EventType::parse("S9999"), None);
    }

    #[test]
    fn status_serializa_com_rotulo_legado() {
        let serializado = serde_json::to_string(&EventStatus::Pending).expect("serializa");
        assert_eq!(serializado, "\"PENDENTE\"");
        assert_eq!(EventStatus::parse("processado"), Some(EventStatus::Processed));
    }
}
