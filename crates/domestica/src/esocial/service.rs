use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use mime::Mime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::channel::{EnvelopeEnvio, GovernmentChannel};
use super::coordinator::{SubmissionCoordinator, SubmissionError, SubmissionPolicy};
use super::domain::{Anexo, AnexoId, EsocialEvent, EventFilter, EventId, LinkKind};
use super::lifecycle::{ConflictError, GovernmentOutcome};
use super::repository::{
    AttachmentStorage, EventRecord, EventRepository, RepositoryError, StorageError,
};
use super::schema::FieldError;
use super::validator::EventValidator;
use super::xml;

/// Inbound shape for `criar_evento`: the type code as text, the reference
/// date, and the raw payload to be validated against that code's schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovoEvento {
    pub tipo: String,
    pub data_evento: NaiveDate,
    pub payload: Value,
}

/// Inbound attachment: metadata plus the raw bytes.
#[derive(Debug, Clone)]
pub struct NovoAnexo {
    pub nome: String,
    pub tipo: String,
    pub conteudo: Vec<u8>,
}

/// Externally supplied size/type policy for attachments.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub tamanho_maximo: u64,
    pub tipos_permitidos: Vec<Mime>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            tamanho_maximo: 5 * 1024 * 1024,
            tipos_permitidos: vec![mime::APPLICATION_PDF, mime::IMAGE_JPEG, mime::IMAGE_PNG],
        }
    }
}

impl AttachmentPolicy {
    pub fn validar(&self, anexo: &NovoAnexo) -> Result<Mime, Vec<FieldError>> {
        let mut erros = Vec::new();
        if anexo.nome.trim().is_empty() {
            erros.push(FieldError::nova("anexo.nome", "campo obrigatório"));
        }

        let mime = match anexo.tipo.parse::<Mime>() {
            Ok(mime) => {
                let permitido = self
                    .tipos_permitidos
                    .iter()
                    .any(|aceito| aceito.essence_str() == mime.essence_str());
                if !permitido {
                    erros.push(FieldError::nova(
                        "anexo.tipo",
                        format!("tipo de mídia não permitido: {}", mime.essence_str()),
                    ));
                }
                Some(mime)
            }
            Err(_) => {
                erros.push(FieldError::nova("anexo.tipo", "tipo de mídia inválido"));
                None
            }
        };

        if anexo.conteudo.len() as u64 > self.tamanho_maximo {
            erros.push(FieldError::nova(
                "anexo.tamanho",
                format!("anexo excede o limite de {} bytes", self.tamanho_maximo),
            ));
        }

        match mime {
            Some(mime) if erros.is_empty() => Ok(mime),
            _ => Err(erros),
        }
    }
}

/// Error raised by the event service.
#[derive(Debug, thiserror::Error)]
pub enum EventServiceError {
    #[error("payload inválido para o tipo de evento")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("evento não encontrado")]
    EventNotFound,
    #[error("anexo não encontrado")]
    AttachmentNotFound,
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl From<RepositoryError> for EventServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            // A lost compare-and-swap is a caller-visible conflict, not an
            // infrastructure failure.
            RepositoryError::Conflict => Self::Conflict(ConflictError::VersionConflict),
            RepositoryError::NotFound => Self::EventNotFound,
            outro => Self::Repository(outro),
        }
    }
}

/// Facade composing validation, the lifecycle guards, attachment and link
/// management, and the submission coordinator.
pub struct EsocialEventService<R, C, S> {
    repositorio: Arc<R>,
    armazenamento: Arc<S>,
    validador: EventValidator,
    coordenador: SubmissionCoordinator<C>,
    politica_anexos: AttachmentPolicy,
}

impl<R, C, S> EsocialEventService<R, C, S>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    pub fn new(
        repositorio: Arc<R>,
        canal: Arc<C>,
        armazenamento: Arc<S>,
        politica_envio: SubmissionPolicy,
        politica_anexos: AttachmentPolicy,
    ) -> Self {
        Self {
            repositorio,
            armazenamento,
            validador: EventValidator::padrao(),
            coordenador: SubmissionCoordinator::new(canal, politica_envio),
            politica_anexos,
        }
    }

    pub fn criar_evento(&self, entrada: NovoEvento) -> Result<EsocialEvent, EventServiceError> {
        let (tipo, payload) = self
            .validador
            .validar_codigo(&entrada.tipo, &entrada.payload)
            .map_err(EventServiceError::Validation)?;

        let evento = EsocialEvent::novo(tipo, entrada.data_evento, payload);
        let registro = self.repositorio.inserir(evento)?;
        info!(
            evento = %registro.evento.id,
            tipo = registro.evento.tipo.codigo(),
            "evento eSocial criado"
        );
        Ok(registro.evento)
    }

    /// Replace the payload, re-running the schema for the event's type. The
    /// payload-must-validate invariant holds on every mutation, not only at
    /// creation.
    pub fn atualizar_evento(
        &self,
        id: &EventId,
        payload: &Value,
    ) -> Result<EsocialEvent, EventServiceError> {
        let mut registro = self.buscar_registro(id)?;
        registro.evento.garantir_editavel()?;

        let payload = self
            .validador
            .validar(registro.evento.tipo, payload)
            .map_err(EventServiceError::Validation)?;
        registro.evento.payload = payload;

        let registro = self.repositorio.atualizar(registro)?;
        Ok(registro.evento)
    }

    pub fn obter_evento(&self, id: &EventId) -> Result<EsocialEvent, EventServiceError> {
        Ok(self.buscar_registro(id)?.evento)
    }

    pub fn listar_eventos(
        &self,
        filtro: &EventFilter,
    ) -> Result<Vec<EsocialEvent>, EventServiceError> {
        let registros = self.repositorio.listar(filtro)?;
        Ok(registros.into_iter().map(|r| r.evento).collect())
    }

    /// Submit the event to the government channel.
    ///
    /// Revalidates the payload (fails closed), claims the single in-flight
    /// slot, applies the PENDENTE/RASCUNHO -> ENVIADO transition through the
    /// version check, and only then touches the network. A transport failure
    /// once every retry is spent leaves the event ENVIADO.
    pub async fn enviar_evento(&self, id: &EventId) -> Result<EsocialEvent, EventServiceError> {
        let ticket = self.coordenador.reservar(*id)?;
        let resultado = self.enviar_reservado(id, &ticket).await;
        self.coordenador.liberar(ticket);
        resultado
    }

    async fn enviar_reservado(
        &self,
        id: &EventId,
        ticket: &super::coordinator::SubmissionTicket,
    ) -> Result<EsocialEvent, EventServiceError> {
        let mut registro = self.buscar_registro(id)?;

        let bruto = serde_json::to_value(&registro.evento.payload).map_err(|_| {
            EventServiceError::Validation(vec![FieldError::nova(
                "payload",
                "payload não serializável",
            )])
        })?;
        let payload = self
            .validador
            .validar(registro.evento.tipo, &bruto)
            .map_err(EventServiceError::Validation)?;
        registro.evento.payload = payload;

        self.coordenador.confirmar_despacho(ticket)?;

        let envelope_xml = xml::gerar_envelope(&registro.evento);
        registro
            .evento
            .iniciar_envio(envelope_xml.clone(), Utc::now())?;
        let registro = self.repositorio.atualizar(registro)?;

        let envelope = EnvelopeEnvio {
            evento_id: *id,
            chave_idempotencia: format!("{}:{}", id, registro.evento.tentativas_envio),
            xml: envelope_xml,
        };
        self.coordenador.despachar(envelope).await?;
        Ok(registro.evento)
    }

    /// Cancel a submission attempt that has not been dispatched yet.
    pub fn cancelar_envio(&self, id: &EventId) -> bool {
        self.coordenador.cancelar_pendente(id)
    }

    /// Apply the government verdict. Any callback landing outside ENVIADO —
    /// including a duplicate of one already applied — conflicts and changes
    /// nothing.
    pub fn receber_retorno(
        &self,
        id: &EventId,
        resultado: GovernmentOutcome,
        mensagem: Option<String>,
    ) -> Result<EsocialEvent, EventServiceError> {
        if resultado == GovernmentOutcome::Rejected && mensagem.is_none() {
            return Err(EventServiceError::Validation(vec![FieldError::nova(
                "mensagem",
                "mensagem é obrigatória para retorno rejeitado",
            )]));
        }

        let mut registro = self.buscar_registro(id)?;
        registro
            .evento
            .aplicar_retorno(resultado, mensagem, Utc::now())?;
        let registro = self.repositorio.atualizar(registro)?;
        info!(
            evento = %registro.evento.id,
            status = registro.evento.status.label(),
            "retorno do eSocial aplicado"
        );
        Ok(registro.evento)
    }

    pub fn corrigir_evento(&self, id: &EventId) -> Result<EsocialEvent, EventServiceError> {
        let mut registro = self.buscar_registro(id)?;
        registro.evento.corrigir()?;
        let registro = self.repositorio.atualizar(registro)?;
        Ok(registro.evento)
    }

    pub fn excluir_evento(&self, id: &EventId) -> Result<(), EventServiceError> {
        let registro = self.buscar_registro(id)?;
        registro.evento.garantir_excluivel()?;

        for anexo in &registro.evento.anexos {
            if let Err(erro) = self.armazenamento.apagar(&anexo.url) {
                warn!(evento = %id, anexo = %anexo.id, %erro, "falha ao apagar blob do anexo");
            }
        }
        self.repositorio.remover(id)?;
        Ok(())
    }

    pub fn adicionar_anexo(
        &self,
        id: &EventId,
        entrada: NovoAnexo,
    ) -> Result<Anexo, EventServiceError> {
        let mut registro = self.buscar_registro(id)?;
        registro.evento.garantir_nao_processado()?;

        let mime = self
            .politica_anexos
            .validar(&entrada)
            .map_err(EventServiceError::Validation)?;

        let url = self
            .armazenamento
            .guardar(id, &entrada.nome, &entrada.conteudo)?;
        let anexo = Anexo {
            id: AnexoId::novo(),
            nome: entrada.nome,
            tipo: mime.essence_str().to_string(),
            tamanho: entrada.conteudo.len() as u64,
            data: Utc::now(),
            url: url.clone(),
        };
        registro.evento.anexos.push(anexo.clone());

        if let Err(erro) = self.repositorio.atualizar(registro) {
            // Lost the race (e.g., against a transition to PROCESSADO): drop
            // the blob again so nothing leaks.
            if let Err(erro_blob) = self.armazenamento.apagar(&url) {
                warn!(evento = %id, %erro_blob, "blob órfão após conflito de anexo");
            }
            return Err(erro.into());
        }
        Ok(anexo)
    }

    /// Pure read, permitted in every status.
    pub fn listar_anexos(&self, id: &EventId) -> Result<Vec<Anexo>, EventServiceError> {
        Ok(self.buscar_registro(id)?.evento.anexos)
    }

    pub fn remover_anexo(
        &self,
        id: &EventId,
        anexo_id: &AnexoId,
    ) -> Result<(), EventServiceError> {
        let mut registro = self.buscar_registro(id)?;
        registro.evento.garantir_nao_processado()?;

        let posicao = registro
            .evento
            .anexos
            .iter()
            .position(|anexo| anexo.id == *anexo_id)
            .ok_or(EventServiceError::AttachmentNotFound)?;
        let anexo = registro.evento.anexos.remove(posicao);

        if let Err(erro) = self.armazenamento.apagar(&anexo.url) {
            warn!(evento = %id, anexo = %anexo.id, %erro, "falha ao apagar blob do anexo");
        }
        self.repositorio.atualizar(registro)?;
        Ok(())
    }

    /// Associate the event with an alert, time record, or document. One link
    /// per kind; re-linking overwrites.
    pub fn vincular_referencia(
        &self,
        id: &EventId,
        kind: LinkKind,
        alvo: String,
    ) -> Result<EsocialEvent, EventServiceError> {
        let mut registro = self.buscar_registro(id)?;
        registro.evento.garantir_nao_processado()?;
        registro.evento.definir_referencia(kind, Some(alvo));
        let registro = self.repositorio.atualizar(registro)?;
        Ok(registro.evento)
    }

    pub fn desvincular_referencia(
        &self,
        id: &EventId,
        kind: LinkKind,
    ) -> Result<EsocialEvent, EventServiceError> {
        let mut registro = self.buscar_registro(id)?;
        registro.evento.garantir_nao_processado()?;
        registro.evento.definir_referencia(kind, None);
        let registro = self.repositorio.atualizar(registro)?;
        Ok(registro.evento)
    }

    fn buscar_registro(&self, id: &EventId) -> Result<EventRecord, EventServiceError> {
        self.repositorio
            .buscar(id)?
            .ok_or(EventServiceError::EventNotFound)
    }
}
