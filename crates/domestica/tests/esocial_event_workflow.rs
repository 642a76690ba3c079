//! Integration specifications for the eSocial event engine.
//!
//! Scenarios exercise the public service facade and the HTTP router
//! end-to-end: creation with typed validation, the submission lifecycle with
//! its conflict guards, and the correction path after a government rejection.

mod common {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use domestica::esocial::{
        AttachmentPolicy, AttachmentStorage, EnvelopeEnvio, EsocialEvent, EsocialEventService,
        EventFilter, EventId, EventRecord, EventRepository, GovernmentChannel, NovoEvento,
        ReciboEnvio, RepositoryError, StorageError, SubmissionPolicy, TransportError,
    };

    pub(super) type Servico = EsocialEventService<Repositorio, Canal, Armazenamento>;

    #[derive(Default)]
    pub(super) struct Repositorio {
        registros: Mutex<HashMap<EventId, EventRecord>>,
    }

    impl EventRepository for Repositorio {
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
            Ok(self.registros.lock().expect("lock").get(id).cloned())
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
            self.registros
                .lock()
                .expect("lock")
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
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
    pub(super) struct Armazenamento {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl AttachmentStorage for Armazenamento {
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

    #[derive(Default)]
    pub(super) struct Canal {
        chamadas: AtomicU32,
    }

    #[async_trait]
    impl GovernmentChannel for Canal {
        async fn enviar(&self, envelope: EnvelopeEnvio) -> Result<ReciboEnvio, TransportError> {
            self.chamadas.fetch_add(1, Ordering::SeqCst);
            Ok(ReciboEnvio {
                protocolo: format!("PROTO-{}", envelope.chave_idempotencia),
                recebido_em: Utc::now(),
            })
        }
    }

    pub(super) fn build_service() -> (Arc<Servico>, Arc<Repositorio>, Arc<Armazenamento>) {
        let repositorio = Arc::new(Repositorio::default());
        let armazenamento = Arc::new(Armazenamento::default());
        let servico = Arc::new(EsocialEventService::new(
            repositorio.clone(),
            Arc::new(Canal::default()),
            armazenamento.clone(),
            SubmissionPolicy {
                max_tentativas: 2,
                timeout: Duration::from_millis(100),
                backoff_base: Duration::from_millis(1),
            },
            AttachmentPolicy::default(),
        ));
        (servico, repositorio, armazenamento)
    }

    pub(super) fn dia(ano: i32, mes: u32, dia: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(ano, mes, dia).expect("data válida")
    }

    pub(super) fn desligamento(data_evento: NaiveDate) -> NovoEvento {
        NovoEvento {
            tipo: "S2299".to_string(),
            data_evento,
            payload: json!({
                "cpf": "12345678900",
                "dataDesligamento": "2024-06-01",
                "motivoDesligamento": "PEDIDO_DEMISSAO"
            }),
        }
    }

    pub(super) fn beneficio_invalido(data_evento: NaiveDate) -> NovoEvento {
        NovoEvento {
            tipo: "S1207".to_string(),
            data_evento,
            payload: json!({
                "cpf": "45678912300",
                "dataInicioBeneficio": "2024-03-01",
                "tipoBeneficio": "AUXILIO_DOENCA",
                "valorBeneficio": 1000,
                "dataFimBeneficio": "2024-02-01"
            }),
        }
    }

}

mod criacao {
    use super::common::*;
    use domestica::esocial::{EventRepository, EventServiceError, EventStatus, EventType};

    #[test]
    fn desligamento_valido_nasce_pendente() {
        let (servico, _, _) = build_service();
        let evento = servico
            .criar_evento(desligamento(dia(2024, 6, 1)))
            .expect("evento criado");
        assert_eq!(evento.tipo, EventType::S2299);
        assert_eq!(evento.status, EventStatus::Pending);
    }

    #[test]
    fn beneficio_com_datas_invertidas_cita_o_campo() {
        let (servico, _, _) = build_service();
        match servico.criar_evento(beneficio_invalido(dia(2024, 3, 1))) {
            Err(EventServiceError::Validation(erros)) => {
                assert!(erros.iter().any(|erro| erro.campo == "dataFimBeneficio"));
            }
            outro => panic!("esperava erro de validação, obtive {outro:?}"),
        }
    }

    #[test]
    fn tipo_desconhecido_nunca_materializa_evento() {
        let (servico, repositorio, _) = build_service();
        let mut entrada = desligamento(dia(2024, 6, 1));
        entrada.tipo = "S8888".to_string();

        match servico.criar_evento(entrada) {
            Err(EventServiceError::Validation(erros)) => assert_eq!(erros.len(), 1),
            outro => panic!("esperava erro de validação, obtive {outro:?}"),
        }
        assert!(repositorio
            .listar(&Default::default())
            .expect("listagem")
            .is_empty());
    }
}

mod ciclo_de_vida {
    use super::common::*;
    use domestica::esocial::{ConflictError, EventServiceError, EventStatus, GovernmentOutcome};

    #[tokio::test]
    async fn sequencia_de_status_e_monotonica() {
        let (servico, _, _) = build_service();
        let evento = servico
            .criar_evento(desligamento(dia(2024, 6, 1)))
            .expect("evento criado");

        let mut observados = vec![evento.status];
        let enviado = servico.enviar_evento(&evento.id).await.expect("envio");
        observados.push(enviado.status);
        let processado = servico
            .receber_retorno(&evento.id, GovernmentOutcome::Accepted, None)
            .expect("retorno");
        observados.push(processado.status);

        assert_eq!(
            observados,
            vec![EventStatus::Pending, EventStatus::Sent, EventStatus::Processed]
        );
    }

    #[tokio::test]
    async fn rejeicao_correcao_e_reenvio() {
        let (servico, _, _) = build_service();
        let evento = servico
            .criar_evento(desligamento(dia(2024, 6, 1)))
            .expect("evento criado");
        servico.enviar_evento(&evento.id).await.expect("envio");

        let rejeitado = servico
            .receber_retorno(
                &evento.id,
                GovernmentOutcome::Rejected,
                Some("CPF inválido".to_string()),
            )
            .expect("rejeição");
        assert_eq!(rejeitado.status, EventStatus::Rejected);
        assert_eq!(rejeitado.mensagem_retorno.as_deref(), Some("CPF inválido"));

        let corrigido = servico.corrigir_evento(&evento.id).expect("correção");
        assert_eq!(corrigido.status, EventStatus::Draft);
        assert!(corrigido.data_envio.is_none());
        assert!(corrigido.data_retorno.is_none());
        assert!(corrigido.mensagem_retorno.is_none());

        let reenviado = servico.enviar_evento(&evento.id).await.expect("reenvio");
        assert_eq!(reenviado.status, EventStatus::Sent);
    }

    #[tokio::test]
    async fn retorno_duplicado_nao_reaplica() {
        let (servico, _, _) = build_service();
        let evento = servico
            .criar_evento(desligamento(dia(2024, 6, 1)))
            .expect("evento criado");
        servico.enviar_evento(&evento.id).await.expect("envio");
        let processado = servico
            .receber_retorno(&evento.id, GovernmentOutcome::Accepted, None)
            .expect("primeiro retorno");

        let erro = servico
            .receber_retorno(&evento.id, GovernmentOutcome::Accepted, None)
            .expect_err("duplicado");
        assert!(matches!(
            erro,
            EventServiceError::Conflict(ConflictError::StaleCallback { .. })
        ));
        let atual = servico.obter_evento(&evento.id).expect("evento");
        assert_eq!(atual.data_retorno, processado.data_retorno);
    }

    #[tokio::test]
    async fn envios_concorrentes_tem_um_vencedor() {
        let (servico, _, _) = build_service();
        let evento = servico
            .criar_evento(desligamento(dia(2024, 6, 1)))
            .expect("evento criado");

        let (primeiro, segundo) = tokio::join!(
            servico.enviar_evento(&evento.id),
            servico.enviar_evento(&evento.id)
        );
        let sucessos = [&primeiro, &segundo].iter().filter(|r| r.is_ok()).count();
        assert_eq!(sucessos, 1);
        assert!(matches!(
            [primeiro, segundo].into_iter().find(|r| r.is_err()),
            Some(Err(EventServiceError::Conflict(_)))
        ));
    }
}

mod http {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use domestica::esocial::esocial_router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn criacao_e_consulta_pelo_router() {
        let (servico, _, _) = build_service();
        let router = esocial_router(servico);

        let criado = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/esocial/eventos")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "tipo": "S2299",
                            "dataEvento": "2024-06-01",
                            "payload": desligamento(dia(2024, 6, 1)).payload,
                        })
                        .to_string(),
                    ))
                    .expect("requisição"),
            )
            .await
            .expect("despacho");
        assert_eq!(criado.status(), StatusCode::CREATED);

        let corpo = to_bytes(criado.into_body(), 1024 * 1024).await.expect("corpo");
        let evento: Value = serde_json::from_slice(&corpo).expect("json");
        let id = evento["id"].as_str().expect("id");

        let consulta = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/esocial/eventos/{id}"))
                    .body(Body::empty())
                    .expect("requisição"),
            )
            .await
            .expect("despacho");
        assert_eq!(consulta.status(), StatusCode::OK);
    }
}
