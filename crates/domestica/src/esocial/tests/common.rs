use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::esocial::channel::{EnvelopeEnvio, GovernmentChannel, ReciboEnvio, TransportError};
use crate::esocial::coordinator::SubmissionPolicy;
use crate::esocial::domain::{EsocialEvent, EventFilter, EventId};
use crate::esocial::repository::{
    AttachmentStorage, EventRecord, EventRepository, RepositoryError, StorageError,
};
use crate::esocial::service::{AttachmentPolicy, EsocialEventService, NovoEvento};

pub(super) type Servico = EsocialEventService<MemoryRepository, ScriptedChannel, MemoryStorage>;

#[derive(Default)]
pub(super) struct MemoryRepository {
    registros: Mutex<HashMap<EventId, EventRecord>>,
}

impl EventRepository for MemoryRepository {
    fn inserir(&self, evento: EsocialEvent) -> Result<EventRecord, RepositoryError> {
        let mut guarda = self.registros.lock().expect("lock");
        if guarda.contains_key(&evento.id) {
            return Err(RepositoryError::Conflict);
        }
        let registro = EventRecord { evento, versao: 1 };
        guarda.insert(registro.evento.id, registro.clone());
        Ok(registro)
    }

    fn buscar(&self, id: &EventId) -> Result<Option<EventRecord>, RepositoryError> {
        let guarda = self.registros.lock().expect("lock");
        Ok(guarda.get(id).cloned())
    }

    fn atualizar(&self, registro: EventRecord) -> Result<EventRecord, RepositoryError> {
        let mut guarda = self.registros.lock().expect("lock");
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
        let mut guarda = self.registros.lock().expect("lock");
        guarda.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn listar(&self, filtro: &EventFilter) -> Result<Vec<EventRecord>, RepositoryError> {
        let guarda = self.registros.lock().expect("lock");
        let mut registros: Vec<_> = guarda
            .values()
            .filter(|registro| filtro.aceita(&registro.evento))
            .cloned()
            .collect();
        registros.sort_by(|a, b| b.evento.data_evento.cmp(&a.evento.data_evento));
        Ok(registros)
    }
}

#[derive(Default)]
pub(super) struct MemoryStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub(super) fn total(&self) -> usize {
        self.blobs.lock().expect("lock").len()
    }
}

impl AttachmentStorage for MemoryStorage {
    fn guardar(
        &self,
        evento: &EventId,
        _nome: &str,
        conteudo: &[u8],
    ) -> Result<String, StorageError> {
        let url = format!("mem://{evento}/{}", Uuid::new_v4());
        self.blobs
            .lock()
            .expect("lock")
            .insert(url.clone(), conteudo.to_vec());
        Ok(url)
    }

    fn apagar(&self, url: &str) -> Result<(), StorageError> {
        self.blobs.lock().expect("lock").remove(url);
        Ok(())
    }
}

/// Channel fake: fails the first `falhas` calls with a transient error, then
/// acknowledges; an `atraso` widens the delivery window for race tests.
pub(super) struct ScriptedChannel {
    falhas_restantes: AtomicU32,
    atraso: Duration,
    chamadas: AtomicU32,
}

impl ScriptedChannel {
    pub(super) fn nova() -> Self {
        Self::com_falhas(0)
    }

    pub(super) fn com_falhas(falhas: u32) -> Self {
        Self {
            falhas_restantes: AtomicU32::new(falhas),
            atraso: Duration::ZERO,
            chamadas: AtomicU32::new(0),
        }
    }

    pub(super) fn com_atraso(atraso: Duration) -> Self {
        Self {
            falhas_restantes: AtomicU32::new(0),
            atraso,
            chamadas: AtomicU32::new(0),
        }
    }

    pub(super) fn chamadas(&self) -> u32 {
        self.chamadas.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GovernmentChannel for ScriptedChannel {
    async fn enviar(&self, envelope: EnvelopeEnvio) -> Result<ReciboEnvio, TransportError> {
        self.chamadas.fetch_add(1, Ordering::SeqCst);
        if !self.atraso.is_zero() {
            tokio::time::sleep(self.atraso).await;
        }
        let restantes = self.falhas_restantes.load(Ordering::SeqCst);
        if restantes > 0 {
            self.falhas_restantes.store(restantes - 1, Ordering::SeqCst);
            return Err(TransportError::Unavailable(
                "instabilidade simulada".to_string(),
            ));
        }
        Ok(ReciboEnvio {
            protocolo: format!("PROTO-{}", envelope.chave_idempotencia),
            recebido_em: Utc::now(),
        })
    }
}

pub(super) fn politica_rapida() -> SubmissionPolicy {
    SubmissionPolicy {
        max_tentativas: 3,
        timeout: Duration::from_millis(50),
        backoff_base: Duration::from_millis(1),
    }
}

pub(super) fn servico_com_canal(
    canal: ScriptedChannel,
) -> (Arc<Servico>, Arc<MemoryRepository>, Arc<MemoryStorage>, Arc<ScriptedChannel>) {
    let repositorio = Arc::new(MemoryRepository::default());
    let armazenamento = Arc::new(MemoryStorage::default());
    let canal = Arc::new(canal);
    let servico = Arc::new(EsocialEventService::new(
        repositorio.clone(),
        canal.clone(),
        armazenamento.clone(),
        politica_rapida(),
        AttachmentPolicy::default(),
    ));
    (servico, repositorio, armazenamento, canal)
}

pub(super) fn servico() -> (Arc<Servico>, Arc<MemoryRepository>, Arc<MemoryStorage>, Arc<ScriptedChannel>) {
    servico_com_canal(ScriptedChannel::nova())
}

pub(super) fn data(ano: i32, mes: u32, dia: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(ano, mes, dia).expect("data válida")
}

pub(super) fn payload_desligamento() -> Value {
    json!({
        "cpf": "12345678900",
        "dataDesligamento": "2024-06-01",
        "motivoDesligamento": "PEDIDO_DEMISSAO"
    })
}

pub(super) fn payload_admissao() -> Value {
    json!({
        "cpf": "123.456.789-00",
        "nome": "Maria de Lourdes Silva",
        "dataNascimento": "1990-04-12",
        "dataAdmissao": "2024-02-01",
        "cargo": "5121-05",
        "salario": 1850.50,
        "endereco": {
            "logradouro": "Rua das Acácias",
            "numero": "120",
            "bairro": "Jardim Paulista",
            "cidade": "São Paulo",
            "uf": "SP",
            "cep": "01423-001",
            "pais": "Brasil",
            "codigoMunicipio": "3550308",
            "codigoPais": "105"
        },
        "contato": {
            "email": "maria.silva@example.com",
            "telefone": "(11) 98765-4321"
        }
    })
}

pub(super) fn novo_evento(tipo: &str, data_evento: NaiveDate, payload: Value) -> NovoEvento {
    NovoEvento {
        tipo: tipo.to_string(),
        data_evento,
        payload,
    }
}
