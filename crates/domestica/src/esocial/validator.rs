use std::sync::Arc;

use serde_json::Value;

use super::domain::EventType;
use super::payload::EventPayload;
use super::registry::PayloadSchemaRegistry;
use super::schema::FieldError;

/// Resolves the schema for an event code and runs it against a raw payload.
pub struct EventValidator {
    registry: Arc<PayloadSchemaRegistry>,
}

impl EventValidator {
    pub fn new(registry: Arc<PayloadSchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn padrao() -> Self {
        Self::new(Arc::new(PayloadSchemaRegistry::padrao()))
    }

    /// Validate a payload for a known event type. A code missing from the
    /// registry is reported as a single top-level error, never a silent pass.
    pub fn validar(&self, tipo: EventType, bruto: &Value) -> Result<EventPayload, Vec<FieldError>> {
        let Some(schema) = self.registry.resolve(tipo) else {
            return Err(vec![FieldError::nova(
                "tipo",
                format!("tipo de evento sem schema registrado: {}", tipo.codigo()),
            )]);
        };
        schema.validar(bruto)
    }

    /// Entry point for callers holding the code as text: an unknown code is
    /// one top-level error citing the `tipo` field.
    pub fn validar_codigo(
        &self,
        codigo: &str,
        bruto: &Value,
    ) -> Result<(EventType, EventPayload), Vec<FieldError>> {
        let Some(tipo) = EventType::parse(codigo) else {
            return Err(vec![FieldError::nova(
                "tipo",
                format!("tipo de evento não suportado: {codigo}"),
            )]);
        };
        let payload = self.validar(tipo, bruto)?;
        Ok((tipo, payload))
    }
}
