use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

/// Payload of an eSocial event, one variant per structurally distinct shape.
///
/// The shape is fixed by the event type code; the schema registry is the only
/// place allowed to construct these, so a typed payload always passed
/// validation. Serialization is untagged: the wire form is the plain field
/// object the government layout expects, with `tipo` carried by the event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Admissao(AdmissaoPayload),
    AlteracaoCadastral(AlteracaoCadastralPayload),
    AvisoPrevio(AvisoPrevioPayload),
    Desligamento(DesligamentoPayload),
    Beneficio(BeneficioPayload),
    Tabular(TabularPayload),
}

impl EventPayload {
    /// Every payload shape identifies the worker by CPF.
    pub fn cpf(&self) -> &str {
        match self {
            EventPayload::Admissao(p) => &p.cpf,
            EventPayload::AlteracaoCadastral(p) => &p.cpf,
            EventPayload::AvisoPrevio(p) => &p.cpf,
            EventPayload::Desligamento(p) => &p.cpf,
            EventPayload::Beneficio(p) => &p.cpf,
            EventPayload::Tabular(p) => &p.cpf,
        }
    }
}

/// S-2200: initial registration of the employment bond.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissaoPayload {
    pub cpf: String,
    pub nome: String,
    pub data_nascimento: NaiveDate,
    pub data_admissao: NaiveDate,
    pub cargo: String,
    pub salario: Decimal,
    pub endereco: Endereco,
    pub contato: Contato,
}

/// S-2205: change of the worker's registration data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlteracaoCadastralPayload {
    pub cpf: String,
    pub data_alteracao: NaiveDate,
    pub nome: String,
    pub endereco: Endereco,
    pub contato: Contato,
}

/// S-2206: contract amendment carrying a prior-notice window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvisoPrevioPayload {
    pub cpf: String,
    pub data_inicio_aviso: NaiveDate,
    pub data_fim_aviso: NaiveDate,
    pub motivo_aviso: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
}

/// S-2299: dismissal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesligamentoPayload {
    pub cpf: String,
    pub data_desligamento: NaiveDate,
    pub motivo_desligamento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
}

/// S-1207: social-security benefit granted to the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficioPayload {
    pub cpf: String,
    pub data_inicio_beneficio: NaiveDate,
    pub tipo_beneficio: String,
    pub valor_beneficio: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_fim_beneficio: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivo_fim_beneficio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
}

/// Shape shared by the event codes whose full legal layout stays outside this
/// core: the worker CPF is validated, the remaining fields ride along opaquely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularPayload {
    pub cpf: String,
    #[serde(flatten)]
    pub campos: Map<String, Value>,
}

/// Residential address block used by the registration shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endereco {
    pub logradouro: String,
    pub numero: String,
    pub bairro: String,
    pub cidade: String,
    pub uf: String,
    pub cep: String,
    pub pais: String,
    pub codigo_municipio: String,
    pub codigo_pais: String,
}

/// Contact block used by the registration shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contato {
    pub email: String,
    pub telefone: String,
}
