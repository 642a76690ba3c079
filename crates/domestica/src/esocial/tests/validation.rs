use serde_json::json;

use super::common::*;
use crate::esocial::domain::{EventStatus, EventType};
use crate::esocial::repository::EventRepository;
use crate::esocial::service::EventServiceError;
use crate::esocial::validator::EventValidator;

#[test]
fn desligamento_valido_cria_evento_pendente() {
    let (servico, _, _, _) = servico();
    let evento = servico
        .criar_evento(novo_evento("S2299", data(2024, 6, 1), payload_desligamento()))
        .expect("evento criado");

    assert_eq!(evento.tipo, EventType::S2299);
    assert_eq!(evento.status, EventStatus::Pending);
    assert_eq!(evento.payload.cpf(), "12345678900");
    assert!(evento.data_envio.is_none());
}

#[test]
fn tipo_desconhecido_gera_erro_unico_e_nada_persiste() {
    let (servico, repositorio, _, _) = servico();
    let erro = servico
        .criar_evento(novo_evento("S9999", data(2024, 6, 1), payload_desligamento()))
        .expect_err("tipo desconhecido");

    match erro {
        EventServiceError::Validation(erros) => {
            assert_eq!(erros.len(), 1);
            assert_eq!(erros[0].campo, "tipo");
        }
        outro => panic!("esperava erro de validação, obtive {outro:?}"),
    }
    assert!(repositorio
        .listar(&Default::default())
        .expect("listagem")
        .is_empty());
}

#[test]
fn admissao_vazia_acumula_todos_os_caminhos_obrigatorios() {
    let validator = EventValidator::padrao();
    let erros = validator
        .validar(EventType::S2200, &json!({}))
        .expect_err("payload vazio");

    let campos: Vec<&str> = erros.iter().map(|erro| erro.campo.as_str()).collect();
    for esperado in [
        "cpf",
        "nome",
        "dataNascimento",
        "dataAdmissao",
        "cargo",
        "salario",
        "endereco",
        "contato",
    ] {
        assert!(campos.contains(&esperado), "faltou o caminho {esperado}: {campos:?}");
    }
}

#[test]
fn campos_aninhados_usam_caminho_pontuado() {
    let validator = EventValidator::padrao();
    let mut payload = payload_admissao();
    payload["endereco"]
        .as_object_mut()
        .expect("endereco")
        .remove("cep");
    payload["endereco"]["uf"] = json!("XX");
    payload["contato"]["telefone"] = json!("1234");

    let erros = validator
        .validar(EventType::S2200, &payload)
        .expect_err("payload inválido");
    let campos: Vec<&str> = erros.iter().map(|erro| erro.campo.as_str()).collect();
    assert!(campos.contains(&"endereco.cep"));
    assert!(campos.contains(&"endereco.uf"));
    assert!(campos.contains(&"contato.telefone"));
}

#[test]
fn todos_os_codigos_exigem_cpf() {
    let validator = EventValidator::padrao();
    for tipo in EventType::TODOS {
        let erros = validator
            .validar(tipo, &json!({}))
            .expect_err("payload vazio nunca valida");
        assert!(
            erros.iter().any(|erro| erro.campo == "cpf"),
            "{tipo} não citou o cpf: {erros:?}"
        );
    }
}

#[test]
fn beneficio_com_fim_antes_do_inicio_e_rejeitado() {
    let (servico, _, _, _) = servico();
    let erro = servico
        .criar_evento(novo_evento(
            "S1207",
            data(2024, 3, 1),
            json!({
                "cpf": "45678912300",
                "dataInicioBeneficio": "2024-03-01",
                "tipoBeneficio": "AUXILIO_DOENCA",
                "valorBeneficio": 1000,
                "dataFimBeneficio": "2024-02-01"
            }),
        ))
        .expect_err("fim antes do início");

    match erro {
        EventServiceError::Validation(erros) => {
            assert!(erros
                .iter()
                .any(|erro| erro.campo == "dataFimBeneficio"
                    && erro.mensagem.contains("anterior à data de início")));
        }
        outro => panic!("esperava erro de validação, obtive {outro:?}"),
    }
}

#[test]
fn violacoes_sao_acumuladas_em_ordem_declarada() {
    let validator = EventValidator::padrao();
    let erros = validator
        .validar(
            EventType::S2299,
            &json!({
                "cpf": "123",
                "dataDesligamento": "2024-13-40",
                "motivoDesligamento": ""
            }),
        )
        .expect_err("múltiplas violações");

    assert_eq!(erros.len(), 3);
    assert_eq!(erros[0].campo, "cpf");
    assert_eq!(erros[1].campo, "dataDesligamento");
    assert_eq!(erros[2].campo, "motivoDesligamento");
}

#[test]
fn tabular_valida_cnpj_quando_presente() {
    let validator = EventValidator::padrao();
    let erros = validator
        .validar(
            EventType::S1200,
            &json!({ "cpf": "12345678900", "cnpj": "12.345/0001" }),
        )
        .expect_err("cnpj truncado");
    assert_eq!(erros[0].campo, "cnpj");

    let payload = validator
        .validar(
            EventType::S1200,
            &json!({ "cpf": "12345678900", "cnpj": "12.345.678/0001-90", "competencia": "2024-05" }),
        )
        .expect("payload tabular válido");
    assert_eq!(payload.cpf(), "12345678900");
}

#[test]
fn atualizacao_revalida_e_preserva_o_evento_em_caso_de_erro() {
    let (servico, _, _, _) = servico();
    let evento = servico
        .criar_evento(novo_evento("S2299", data(2024, 6, 1), payload_desligamento()))
        .expect("evento criado");

    let erro = servico
        .atualizar_evento(&evento.id, &json!({ "cpf": "999" }))
        .expect_err("payload truncado");
    assert!(matches!(erro, EventServiceError::Validation(_)));

    let atual = servico.obter_evento(&evento.id).expect("evento persiste");
    assert_eq!(atual.payload, evento.payload);
    assert_eq!(atual.status, EventStatus::Pending);
}

#[test]
fn atualizacao_valida_substitui_o_payload() {
    let (servico, _, _, _) = servico();
    let evento = servico
        .criar_evento(novo_evento("S2299", data(2024, 6, 1), payload_desligamento()))
        .expect("evento criado");

    let atualizado = servico
        .atualizar_evento(
            &evento.id,
            &json!({
                "cpf": "98765432100",
                "dataDesligamento": "2024-06-15",
                "motivoDesligamento": "ACORDO",
                "observacao": "acordo entre as partes"
            }),
        )
        .expect("atualização válida");
    assert_eq!(atualizado.payload.cpf(), "98765432100");
}
