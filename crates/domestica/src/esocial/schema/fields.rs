//! Field extraction helpers shared by the payload schemas.
//!
//! Every helper records its violations in the [`Coletor`] and returns `None`
//! on failure, so a schema can walk all declared fields before deciding.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::FieldError;

/// Accumulates field errors in declaration order.
#[derive(Debug, Default)]
pub struct Coletor {
    erros: Vec<FieldError>,
}

impl Coletor {
    pub fn novo() -> Self {
        Self::default()
    }

    pub fn registrar(&mut self, campo: &str, mensagem: impl Into<String>) {
        self.erros.push(FieldError::nova(campo, mensagem));
    }

    pub fn vazio(&self) -> bool {
        self.erros.is_empty()
    }

    /// Fold another collector's violations in, prefixing their paths with the
    /// enclosing block name (`endereco.cep`, `contato.email`, ...).
    pub fn absorver(&mut self, prefixo: &str, outro: Coletor) {
        for erro in outro.erros {
            self.erros.push(FieldError::nova(
                format!("{prefixo}.{}", erro.campo),
                erro.mensagem,
            ));
        }
    }

    /// Consume the collector into the error list. A schema only calls this on
    /// the failure path; the guard keeps an accidental empty list from
    /// reading as success upstream.
    pub fn lista(mut self) -> Vec<FieldError> {
        if self.erros.is_empty() {
            self.erros
                .push(FieldError::nova("payload", "payload inválido"));
        }
        self.erros
    }
}

/// The payload must be a JSON object before any field check makes sense.
pub fn como_objeto(bruto: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    bruto.as_object().ok_or_else(|| {
        vec![FieldError::nova(
            "payload",
            "payload deve ser um objeto JSON",
        )]
    })
}

pub fn texto(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<String> {
    match obj.get(campo) {
        None | Some(Value::Null) => {
            erros.registrar(campo, "campo obrigatório");
            None
        }
        Some(Value::String(valor)) if !valor.trim().is_empty() => Some(valor.trim().to_string()),
        Some(_) => {
            erros.registrar(campo, "deve ser um texto não vazio");
            None
        }
    }
}

pub fn texto_opcional(
    obj: &Map<String, Value>,
    campo: &str,
    erros: &mut Coletor,
) -> Option<String> {
    match obj.get(campo) {
        None | Some(Value::Null) => None,
        Some(Value::String(valor)) if !valor.trim().is_empty() => Some(valor.trim().to_string()),
        Some(_) => {
            erros.registrar(campo, "deve ser um texto não vazio");
            None
        }
    }
}

pub fn data(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<NaiveDate> {
    let bruto = texto(obj, campo, erros)?;
    analisar_data(&bruto, campo, erros)
}

pub fn data_opcional(
    obj: &Map<String, Value>,
    campo: &str,
    erros: &mut Coletor,
) -> Option<NaiveDate> {
    let bruto = texto_opcional(obj, campo, erros)?;
    analisar_data(&bruto, campo, erros)
}

fn analisar_data(bruto: &str, campo: &str, erros: &mut Coletor) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(bruto, "%Y-%m-%d") {
        Ok(valor) => Some(valor),
        Err(_) => {
            erros.registrar(campo, "data inválida (use AAAA-MM-DD)");
            None
        }
    }
}

/// CPF: eleven numeric digits, mask tolerated.
pub fn cpf(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<String> {
    let bruto = texto(obj, campo, erros)?;
    let digitos = somente_digitos(&bruto);
    if cpf_valido(&digitos) {
        Some(digitos)
    } else {
        erros.registrar(campo, "CPF inválido");
        None
    }
}

/// CNPJ: fourteen numeric digits, mask tolerated. Only validated when present.
pub fn cnpj_opcional(
    obj: &Map<String, Value>,
    campo: &str,
    erros: &mut Coletor,
) -> Option<String> {
    let bruto = texto_opcional(obj, campo, erros)?;
    let digitos = somente_digitos(&bruto);
    if cnpj_valido(&digitos) {
        Some(digitos)
    } else {
        erros.registrar(campo, "CNPJ inválido");
        None
    }
}

/// Monetary amount: accepts a JSON number or a numeric string. With
/// `positivo` the amount must be strictly greater than zero.
pub fn valor_monetario(
    obj: &Map<String, Value>,
    campo: &str,
    positivo: bool,
    erros: &mut Coletor,
) -> Option<Decimal> {
    let valor = match obj.get(campo) {
        None | Some(Value::Null) => {
            erros.registrar(campo, "campo obrigatório");
            return None;
        }
        Some(Value::Number(numero)) => numero.to_string().parse::<Decimal>().ok(),
        Some(Value::String(bruto)) => bruto.trim().parse::<Decimal>().ok(),
        Some(_) => None,
    };

    let Some(valor) = valor else {
        erros.registrar(campo, "valor monetário inválido");
        return None;
    };

    if valor < Decimal::ZERO {
        erros.registrar(campo, "valor não pode ser negativo");
        return None;
    }
    if positivo && valor == Decimal::ZERO {
        erros.registrar(campo, "valor deve ser maior que zero");
        return None;
    }
    Some(valor)
}

pub fn uf(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<String> {
    let bruto = texto(obj, campo, erros)?;
    let normalizado = bruto.to_ascii_uppercase();
    if uf_valida(&normalizado) {
        Some(normalizado)
    } else {
        erros.registrar(campo, "UF inválida");
        None
    }
}

/// CEP: eight numeric digits, mask tolerated.
pub fn cep(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<String> {
    let bruto = texto(obj, campo, erros)?;
    let digitos = somente_digitos(&bruto);
    if digitos.len() == 8 {
        Some(digitos)
    } else {
        erros.registrar(campo, "CEP deve ter 8 dígitos");
        None
    }
}

pub fn email(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<String> {
    let bruto = texto(obj, campo, erros)?;
    let valido = matches!(
        bruto.split_once('@'),
        Some((usuario, dominio))
            if !usuario.is_empty() && !dominio.is_empty() && dominio.contains('.')
    );
    if !valido {
        erros.registrar(campo, "e-mail inválido");
        return None;
    }
    Some(bruto)
}

/// Phone: at least ten digits once the mask is stripped.
pub fn telefone(obj: &Map<String, Value>, campo: &str, erros: &mut Coletor) -> Option<String> {
    let bruto = texto(obj, campo, erros)?;
    let digitos = somente_digitos(&bruto);
    if digitos.len() >= 10 {
        Some(digitos)
    } else {
        erros.registrar(campo, "telefone deve ter ao menos 10 dígitos");
        None
    }
}

/// Nested object block; its absence is one violation at the block's own path.
pub fn bloco<'a>(
    obj: &'a Map<String, Value>,
    campo: &str,
    erros: &mut Coletor,
) -> Option<&'a Map<String, Value>> {
    match obj.get(campo) {
        None | Some(Value::Null) => {
            erros.registrar(campo, "campo obrigatório");
            None
        }
        Some(Value::Object(bloco)) => Some(bloco),
        Some(_) => {
            erros.registrar(campo, "deve ser um objeto");
            None
        }
    }
}

pub fn somente_digitos(bruto: &str) -> String {
    bruto.chars().filter(char::is_ascii_digit).collect()
}

pub fn cpf_valido(digitos: &str) -> bool {
    digitos.len() == 11 && digitos.chars().all(|c| c.is_ascii_digit())
}

pub fn cnpj_valido(digitos: &str) -> bool {
    digitos.len() == 14 && digitos.chars().all(|c| c.is_ascii_digit())
}

const UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

pub fn uf_valida(sigla: &str) -> bool {
    UFS.contains(&sigla)
}
