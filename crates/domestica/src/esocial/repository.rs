use super::domain::{EsocialEvent, EventFilter, EventId};

/// Repository row: the event plus the optimistic-concurrency version.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub evento: EsocialEvent,
    pub versao: u64,
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `atualizar` is a compare-and-swap on `versao`: implementations must refuse
/// the write with [`RepositoryError::Conflict`] when the stored version moved,
/// which is what serializes concurrent mutations per event id.
pub trait EventRepository: Send + Sync {
    fn inserir(&self, evento: EsocialEvent) -> Result<EventRecord, RepositoryError>;
    fn buscar(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError>;
    fn atualizar(&self, registro: EventRecord) -> Result<EventRecord, RepositoryError>;
    fn remover(&self, id: &EventId) -> Result<(), RepositoryError>;
    /// Events matching the filter, most recent `dataEvento` first.
    fn listar(&self, filtro: &EventFilter) -> Result<Vec<EventRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflito de versão do registro")]
    Conflict,
    #[error("registro não encontrado")]
    NotFound,
    #[error("repositório indisponível: {0}")]
    Unavailable(String),
}

/// Blob store behind attachment uploads. Implementations return the opaque
/// locator persisted on the [`super::domain::Anexo`].
pub trait AttachmentStorage: Send + Sync {
    fn guardar(
        &self,
        evento: &EventId,
        nome: &str,
        conteudo: &[u8],
    ) -> Result<String, StorageError>;
    fn apagar(&self, url: &str) -> Result<(), StorageError>;
}

/// Attachment storage error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("armazenamento de anexos indisponível: {0}")]
    Unavailable(String),
}
