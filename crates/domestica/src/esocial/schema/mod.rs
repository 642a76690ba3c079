//! Structural payload schemas.
//!
//! A schema turns the raw JSON a caller supplies into the typed payload
//! variant for its event code, reporting every violation it finds instead of
//! stopping at the first so forms can surface the complete list.

pub mod fields;

mod events;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::payload::EventPayload;

pub use events::{
    AdmissaoSchema, AlteracaoCadastralSchema, AvisoPrevioSchema, BeneficioSchema,
    DesligamentoSchema, TabularSchema,
};

/// A single field violation, addressed by its dotted path in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub campo: String,
    pub mensagem: String,
}

impl FieldError {
    pub fn nova(campo: impl Into<String>, mensagem: impl Into<String>) -> Self {
        Self {
            campo: campo.into(),
            mensagem: mensagem.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.campo, self.mensagem)
    }
}

/// Structural validator for one event code's payload.
pub trait PayloadSchema: Send + Sync {
    /// Validate `bruto` field by field, in declared order, collecting every
    /// violation. Either the whole payload types or the result is the full
    /// error list; there is no partial success.
    fn validar(&self, bruto: &Value) -> Result<EventPayload, Vec<FieldError>>;
}
