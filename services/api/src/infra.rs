use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use uuid::Uuid;

use domestica::esocial::{
    AttachmentStorage, EnvelopeEnvio, EsocialEvent, EsocialEventService, EventFilter, EventId,
    EventRecord, EventRepository, GovernmentChannel, ReciboEnvio, RepositoryError, StorageError,
    TransportError,
};

pub(crate) type EventService =
    EsocialEventService<InMemoryEventRepository, SimulatedGovernmentChannel, InMemoryAttachmentStorage>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEventRepository {
    registros: Arc<Mutex<HashMap<EventId, EventRecord>>>,
}

impl EventRepository for InMemoryEventRepository {
    fn inserir(&self, evento: EsocialEvent) -> Result<EventRecord, RepositoryError> {
        let mut guarda = self.registros.lock().expect("repository mutex poisoned");
        if guarda.contains_key(&evento.id) {
            return Err(RepositoryError::Conflict);
        }
        let registro = EventRecord { evento, versao: 1 };
        guarda.insert(registro.evento.id, registro.clone());
        Ok(registro)
    }

    fn buscar(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        let guarda = self.registros.lock().expect("repository mutex poisoned");
        Ok(guarda.get(id).cloned())
    }

    fn atualizar(&self, registro: EventRecord) -> Result<EventRecord, RepositoryError> {
        let mut guarda = self.registros.lock().expect("repository mutex poisoned");
        match guarda.get_mut(&registro.evento.id) {
            Some(atual) if atual.versao == registro.versao => {
                let novo = EventRecord {
                    evento: registro.evento,
                    versao: registro.versao + 1,
                };
                *atual = novo.clone();
                Ok(novo)
            }
            Some(_) => Err(RepositoryError::Conflict),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remover(&self, id: &EventId) -> Result<(), RepositoryError> {
        let mut guarda = self.registros.lock().expect("repository mutex poisoned");
        guarda.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn listar(&self, filtro: &EventFilter) -> Result<Vec<EventRecord>, RepositoryError> {
        let guarda = self.registros.lock().expect("repository mutex poisoned");
        let mut registros: Vec<_> = guarda
            .values()
            .filter(|registro| filtro.aceita(&registro.evento))
            .cloned()
            .collect();
        registros.sort_by(|a, b| b.evento.data_evento.cmp(&a.evento.data_evento));
        Ok(registros)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAttachmentStorage {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl AttachmentStorage for InMemoryAttachmentStorage {
    fn guardar(
        &self,
        evento: &EventId,
        _nome: &str,
        conteudo: &[u8],
    ) -> Result<String, StorageError> {
        let url = format!("mem://{evento}/{}", Uuid::new_v4());
        self.blobs
            .lock()
            .expect("storage mutex poisoned")
            .insert(url.clone(), conteudo.to_vec());
        Ok(url)
    }

    fn apagar(&self, url: &str) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .expect("storage mutex poisoned")
            .remove(url);
        Ok(())
    }
}

/// Stand-in for the SOAP transport: acknowledges every envelope with a
/// synthetic protocol. `falhas_iniciais` makes the first deliveries fail so
/// the demo can show the retry path.
pub(crate) struct SimulatedGovernmentChannel {
    falhas_restantes: AtomicU32,
}

impl SimulatedGovernmentChannel {
    pub(crate) fn novo(falhas_iniciais: u32) -> Self {
        Self {
            falhas_restantes: AtomicU32::new(falhas_iniciais),
        }
    }
}

impl Default for SimulatedGovernmentChannel {
    fn default() -> Self {
        Self::novo(0)
    }
}

#[async_trait]
impl GovernmentChannel for SimulatedGovernmentChannel {
    async fn enviar(&self, envelope: EnvelopeEnvio) -> Result<ReciboEnvio, TransportError> {
        let restantes = self.falhas_restantes.load(Ordering::SeqCst);
        if restantes > 0 {
            self.falhas_restantes.store(restantes - 1, Ordering::SeqCst);
            return Err(TransportError::Unavailable(
                "instabilidade simulada do webservice".to_string(),
            ));
        }
        Ok(ReciboEnvio {
            protocolo: format!("1.2.{}", envelope.chave_idempotencia),
            recebido_em: Utc::now(),
        })
    }
}
