use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::domain::{AnexoId, EventFilter, EventId, EventStatus, EventType, LinkKind};
use super::lifecycle::GovernmentOutcome;
use super::repository::{AttachmentStorage, EventRepository, RepositoryError};
use super::schema::FieldError;
use super::service::{EsocialEventService, EventServiceError, NovoAnexo, NovoEvento};
use super::GovernmentChannel;

/// Router builder exposing the event engine under `/api/v1/esocial`.
pub fn esocial_router<R, C, S>(service: Arc<EsocialEventService<R, C, S>>) -> Router
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    Router::new()
        .route(
            "/api/v1/esocial/eventos",
            post(criar_handler::<R, C, S>).get(listar_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id",
            get(obter_handler::<R, C, S>)
                .put(atualizar_handler::<R, C, S>)
                .delete(excluir_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id/envio",
            post(enviar_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id/retorno",
            post(retorno_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id/correcao",
            post(corrigir_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id/anexos",
            post(adicionar_anexo_handler::<R, C, S>).get(listar_anexos_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id/anexos/:anexo_id",
            delete(remover_anexo_handler::<R, C, S>),
        )
        .route(
            "/api/v1/esocial/eventos/:id/referencias/:kind",
            put(vincular_handler::<R, C, S>).delete(desvincular_handler::<R, C, S>),
        )
        .with_state(service)
}

impl IntoResponse for EventServiceError {
    fn into_response(self) -> Response {
        match self {
            EventServiceError::Validation(erros) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": erros })),
            )
                .into_response(),
            EventServiceError::Conflict(erro) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": erro.to_string() })),
            )
                .into_response(),
            EventServiceError::EventNotFound | EventServiceError::AttachmentNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            EventServiceError::Repository(RepositoryError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            EventServiceError::Repository(RepositoryError::Conflict) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            EventServiceError::Submission(erro) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": erro.to_string() })),
            )
                .into_response(),
            outro => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": outro.to_string() })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FiltroQuery {
    tipo: Option<String>,
    status: Option<String>,
    #[serde(rename = "dataInicio")]
    data_inicio: Option<NaiveDate>,
    #[serde(rename = "dataFim")]
    data_fim: Option<NaiveDate>,
}

impl FiltroQuery {
    fn em_filtro(self) -> Result<EventFilter, EventServiceError> {
        let mut erros = Vec::new();

        let tipo = match self.tipo.as_deref() {
            None => None,
            Some(raw) => match EventType::parse(raw) {
                Some(tipo) => Some(tipo),
                None => {
                    erros.push(FieldError::nova(
                        "tipo",
                        format!("tipo de evento não suportado: {raw}"),
                    ));
                    None
                }
            },
        };
        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => match EventStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    erros.push(FieldError::nova(
                        "status",
                        format!("status desconhecido: {raw}"),
                    ));
                    None
                }
            },
        };

        if !erros.is_empty() {
            return Err(EventServiceError::Validation(erros));
        }
        Ok(EventFilter {
            tipo,
            status,
            periodo_inicio: self.data_inicio,
            periodo_fim: self.data_fim,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RetornoRequest {
    resultado: String,
    mensagem: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VincularRequest {
    #[serde(rename = "targetId")]
    target_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnexoQuery {
    nome: String,
    tipo: String,
}

fn parse_id(raw: &str) -> Result<EventId, EventServiceError> {
    Uuid::parse_str(raw)
        .map(EventId)
        .map_err(|_| EventServiceError::EventNotFound)
}

fn parse_anexo_id(raw: &str) -> Result<AnexoId, EventServiceError> {
    Uuid::parse_str(raw)
        .map(AnexoId)
        .map_err(|_| EventServiceError::AttachmentNotFound)
}

fn parse_kind(raw: &str) -> Result<LinkKind, EventServiceError> {
    LinkKind::parse(raw).ok_or_else(|| {
        EventServiceError::Validation(vec![FieldError::nova(
            "kind",
            format!("tipo de referência desconhecido: {raw}"),
        )])
    })
}

pub(crate) async fn criar_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Json(entrada): Json<NovoEvento>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento = service.criar_evento(entrada)?;
    Ok((StatusCode::CREATED, Json(evento)).into_response())
}

pub(crate) async fn listar_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Query(filtro): Query<FiltroQuery>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let filtro = filtro.em_filtro()?;
    let eventos = service.listar_eventos(&filtro)?;
    let resumos: Vec<_> = eventos.iter().map(|evento| evento.resumo()).collect();
    Ok(Json(resumos).into_response())
}

pub(crate) async fn obter_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento = service.obter_evento(&parse_id(&id)?)?;
    Ok(Json(evento).into_response())
}

pub(crate) async fn atualizar_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento = service.atualizar_evento(&parse_id(&id)?, &payload)?;
    Ok(Json(evento).into_response())
}

pub(crate) async fn excluir_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    service.excluir_evento(&parse_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn enviar_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento = service.enviar_evento(&parse_id(&id)?).await?;
    Ok(Json(evento).into_response())
}

pub(crate) async fn retorno_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
    Json(corpo): Json<RetornoRequest>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let Some(resultado) = GovernmentOutcome::parse(&corpo.resultado) else {
        return Err(EventServiceError::Validation(vec![FieldError::nova(
            "resultado",
            "resultado deve ser 'accepted' ou 'rejected'",
        )]));
    };
    let evento = service.receber_retorno(&parse_id(&id)?, resultado, corpo.mensagem)?;
    Ok(Json(evento).into_response())
}

pub(crate) async fn corrigir_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento = service.corrigir_evento(&parse_id(&id)?)?;
    Ok(Json(evento).into_response())
}

pub(crate) async fn adicionar_anexo_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
    Query(meta): Query<AnexoQuery>,
    corpo: Bytes,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let anexo = service.adicionar_anexo(
        &parse_id(&id)?,
        NovoAnexo {
            nome: meta.nome,
            tipo: meta.tipo,
            conteudo: corpo.to_vec(),
        },
    )?;
    Ok((StatusCode::CREATED, Json(anexo)).into_response())
}

pub(crate) async fn listar_anexos_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path(id): Path<String>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let anexos = service.listar_anexos(&parse_id(&id)?)?;
    Ok(Json(anexos).into_response())
}

pub(crate) async fn remover_anexo_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path((id, anexo_id)): Path<(String, String)>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    service.remover_anexo(&parse_id(&id)?, &parse_anexo_id(&anexo_id)?)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn vincular_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path((id, kind)): Path<(String, String)>,
    Json(corpo): Json<VincularRequest>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento =
        service.vincular_referencia(&parse_id(&id)?, parse_kind(&kind)?, corpo.target_id)?;
    Ok(Json(evento).into_response())
}

pub(crate) async fn desvincular_handler<R, C, S>(
    State(service): State<Arc<EsocialEventService<R, C, S>>>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<Response, EventServiceError>
where
    R: EventRepository + 'static,
    C: GovernmentChannel + 'static,
    S: AttachmentStorage + 'static,
{
    let evento = service.desvincular_referencia(&parse_id(&id)?, parse_kind(&kind)?)?;
    Ok(Json(evento).into_response())
}
