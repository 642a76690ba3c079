use serde_json::Value;

use super::fields::{self, Coletor};
use super::{FieldError, PayloadSchema};
use crate::esocial::domain::EventType;
use crate::esocial::payload::{
    AdmissaoPayload, AlteracaoCadastralPayload, AvisoPrevioPayload, BeneficioPayload, Contato,
    DesligamentoPayload, Endereco, EventPayload, TabularPayload,
};

/// S-2200: admission. The registration shape with the address and contact
/// blocks the government layout requires.
pub struct AdmissaoSchema;

impl PayloadSchema for AdmissaoSchema {
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let obj = fields::como_objeto(bruto)?;
        let mut erros = Coletor::novo();

        let cpf = fields::cpf(obj, "cpf", &mut erros);
        let nome = fields::texto(obj, "nome", &mut erros);
        let data_nascimento = fields::data(obj, "dataNascimento", &mut erros);
        let data_admissao = fields::data(obj, "dataAdmissao", &mut erros);
        let cargo = fields::texto(obj, "cargo", &mut erros);
        let salario = fields::valor_monetario(obj, "salario", true, &mut erros);
        let endereco = validar_endereco(obj, &mut erros);
        let contato = validar_contato(obj, &mut erros);

        match (
            cpf,
            nome,
            data_nascimento,
            data_admissao,
            cargo,
            salario,
            endereco,
            contato,
        ) {
            (
                Some(cpf),
                Some(nome),
                Some(data_nascimento),
                Some(data_admissao),
                Some(cargo),
                Some(salario),
                Some(endereco),
                Some(contato),
            ) if erros.vazio() => Ok(EventPayload::Admissao(AdmissaoPayload {
                cpf,
                nome,
                data_nascimento,
                data_admissao,
                cargo,
                salario,
                endereco,
                contato,
            })),
            _ => Err(erros.lista()),
        }
    }
}

/// S-2205: registration data change.
pub struct AlteracaoCadastralSchema;

impl PayloadSchema for AlteracaoCadastralSchema {
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let obj = fields::como_objeto(bruto)?;
        let mut erros = Coletor::novo();

        let cpf = fields::cpf(obj, "cpf", &mut erros);
        let data_alteracao = fields::data(obj, "dataAlteracao", &mut erros);
        let nome = fields::texto(obj, "nome", &mut erros);
        let endereco = validar_endereco(obj, &mut erros);
        let contato = validar_contato(obj, &mut erros);

        match (cpf, data_alteracao, nome, endereco, contato) {
            (Some(cpf), Some(data_alteracao), Some(nome), Some(endereco), Some(contato))
                if erros.vazio() =>
            {
                Ok(EventPayload::AlteracaoCadastral(AlteracaoCadastralPayload {
                    cpf,
                    data_alteracao,
                    nome,
                    endereco,
                    contato,
                }))
            }
            _ => Err(erros.lista()),
        }
    }
}

/// S-2206: contract amendment with a prior-notice window.
pub struct AvisoPrevioSchema;

impl PayloadSchema for AvisoPrevioSchema {
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let obj = fields::como_objeto(bruto)?;
        let mut erros = Coletor::novo();

        let cpf = fields::cpf(obj, "cpf", &mut erros);
        let data_inicio_aviso = fields::data(obj, "dataInicioAviso", &mut erros);
        let data_fim_aviso = fields::data(obj, "dataFimAviso", &mut erros);
        let motivo_aviso = fields::texto(obj, "motivoAviso", &mut erros);
        let observacao = fields::texto_opcional(obj, "observacao", &mut erros);

        if let (Some(inicio), Some(fim)) = (data_inicio_aviso, data_fim_aviso) {
            if fim < inicio {
                erros.registrar(
                    "dataFimAviso",
                    "data de fim do aviso anterior à data de início",
                );
            }
        }

        match (cpf, data_inicio_aviso, data_fim_aviso, motivo_aviso) {
            (Some(cpf), Some(data_inicio_aviso), Some(data_fim_aviso), Some(motivo_aviso))
                if erros.vazio() =>
            {
                Ok(EventPayload::AvisoPrevio(AvisoPrevioPayload {
                    cpf,
                    data_inicio_aviso,
                    data_fim_aviso,
                    motivo_aviso,
                    observacao,
                }))
            }
            _ => Err(erros.lista()),
        }
    }
}

/// S-2299: dismissal.
pub struct DesligamentoSchema;

impl PayloadSchema for DesligamentoSchema {
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let obj = fields::como_objeto(bruto)?;
        let mut erros = Coletor::novo();

        let cpf = fields::cpf(obj, "cpf", &mut erros);
        let data_desligamento = fields::data(obj, "dataDesligamento", &mut erros);
        let motivo_desligamento = fields::texto(obj, "motivoDesligamento", &mut erros);
        let observacao = fields::texto_opcional(obj, "observacao", &mut erros);

        match (cpf, data_desligamento, motivo_desligamento) {
            (Some(cpf), Some(data_desligamento), Some(motivo_desligamento)) if erros.vazio() => {
                Ok(EventPayload::Desligamento(DesligamentoPayload {
                    cpf,
                    data_desligamento,
                    motivo_desligamento,
                    observacao,
                }))
            }
            _ => Err(erros.lista()),
        }
    }
}

/// S-1207: benefit grant. The end date, when present, cannot precede the
/// start date.
pub struct BeneficioSchema;

impl PayloadSchema for BeneficioSchema {
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let obj = fields::como_objeto(bruto)?;
        let mut erros = Coletor::novo();

        let cpf = fields::cpf(obj, "cpf", &mut erros);
        let data_inicio_beneficio = fields::data(obj, "dataInicioBeneficio", &mut erros);
        let tipo_beneficio = fields::texto(obj, "tipoBeneficio", &mut erros);
        let valor_beneficio = fields::valor_monetario(obj, "valorBeneficio", true, &mut erros);
        let data_fim_beneficio = fields::data_opcional(obj, "dataFimBeneficio", &mut erros);
        let motivo_fim_beneficio = fields::texto_opcional(obj, "motivoFimBeneficio", &mut erros);
        let observacao = fields::texto_opcional(obj, "observacao", &mut erros);

        if let (Some(inicio), Some(fim)) = (data_inicio_beneficio, data_fim_beneficio) {
            if fim < inicio {
                erros.registrar(
                    "dataFimBeneficio",
                    "data de fim do benefício anterior à data de início",
                );
            }
        }

        match (cpf, data_inicio_beneficio, tipo_beneficio, valor_beneficio) {
            (
                Some(cpf),
                Some(data_inicio_beneficio),
                Some(tipo_beneficio),
                Some(valor_beneficio),
            ) if erros.vazio() => Ok(EventPayload::Beneficio(BeneficioPayload {
                cpf,
                data_inicio_beneficio,
                tipo_beneficio,
                valor_beneficio,
                data_fim_beneficio,
                motivo_fim_beneficio,
                observacao,
            })),
            _ => Err(erros.lista()),
        }
    }
}

/// Schema for the codes whose full legal layout lives outside this core: the
/// worker CPF is mandatory, an employer CNPJ is checked when present, and the
/// remaining fields ride along untouched.
pub struct TabularSchema {
    pub tipo: EventType,
}

impl PayloadSchema for TabularSchema {
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let obj = fields::como_objeto(bruto)?;
        let mut erros = Coletor::novo();

        let cpf = fields::cpf(obj, "cpf", &mut erros);
        fields::cnpj_opcional(obj, "cnpj", &mut erros);

        match cpf {
            Some(cpf) if erros.vazio() => {
                let campos = obj
                    .iter()
                    .filter(|(chave, _)| chave.as_str() != "cpf")
                    .map(|(chave, valor)| (chave.clone(), valor.clone()))
                    .collect();
                Ok(EventPayload::Tabular(TabularPayload { cpf, campos }))
            }
            _ => Err(erros.lista()),
        }
    }
}

fn validar_endereco(
    obj: &serde_json::Map<String, Value>,
    erros: &mut Coletor,
) -> Option<Endereco> {
    let bloco = fields::bloco(obj, "endereco", erros)?;
    let mut erros_bloco = Coletor::novo();

    let logradouro = fields::texto(bloco, "logradouro", &mut erros_bloco);
    let numero = fields::texto(bloco, "numero", &mut erros_bloco);
    let bairro = fields::texto(bloco, "bairro", &mut erros_bloco);
    let cidade = fields::texto(bloco, "cidade", &mut erros_bloco);
    let uf = fields::uf(bloco, "uf", &mut erros_bloco);
    let cep = fields::cep(bloco, "cep", &mut erros_bloco);
    let pais = fields::texto(bloco, "pais", &mut erros_bloco);
    let codigo_municipio = fields::texto(bloco, "codigoMunicipio", &mut erros_bloco);
    let codigo_pais = fields::texto(bloco, "codigoPais", &mut erros_bloco);

    erros.absorver("endereco", erros_bloco);

    Some(Endereco {
        logradouro: logradouro?,
        numero: numero?,
        bairro: bairro?,
        cidade: cidade?,
        uf: uf?,
        cep: cep?,
        pais: pais?,
        codigo_municipio: codigo_municipio?,
        codigo_pais: codigo_pais?,
    })
}

fn validar_contato(obj: &serde_json::Map<String, Value>, erros: &mut Coletor) -> Option<Contato> {
    let bloco = fields::bloco(obj, "contato", erros)?;
    let mut erros_bloco = Coletor::novo();

    let email = fields::email(bloco, "email", &mut erros_bloco);
    let telefone = fields::telefone(bloco, "telefone", &mut erros_bloco);

    erros.absorver("contato", erros_bloco);

    Some(Contato {
        email: email?,
        telefone: telefone?,
    })
}
