use std::collections::HashMap;
use std::sync::Arc;

use super::domain::EventType;
use super::schema::{
    AdmissaoSchema, AlteracaoCadastralSchema, AvisoPrevioSchema, BeneficioSchema,
    DesligamentoSchema, PayloadSchema, TabularSchema,
};

/// Maps an event type code to the structural validator for its payload.
///
/// Dispatch is a plain lookup: supporting a new code means registering one
/// more entry, never touching the callers.
pub struct PayloadSchemaRegistry {
    entradas: HashMap<EventType, Arc<dyn PayloadSchema>>,
}

impl PayloadSchemaRegistry {
    pub fn vazio() -> Self {
        Self {
            entradas: HashMap::new(),
        }
    }

    /// Registry covering the whole closed set of codes: the shapes this
    /// module types in full, plus the tabular fallback for the rest.
    pub fn padrao() -> Self {
        let mut registry = Self::vazio();
        registry.registrar(EventType::S2200, Arc::new(AdmissaoSchema));
        registry.registrar(EventType::S2205, Arc::new(AlteracaoCadastralSchema));
        registry.registrar(EventType::S2206, Arc::new(AvisoPrevioSchema));
        registry.registrar(EventType::S2299, Arc::new(DesligamentoSchema));
        registry.registrar(EventType::S1207, Arc::new(BeneficioSchema));

        for tipo in EventType::TODOS {
            if !registry.entradas.contains_key(&tipo) {
                registry.registrar(tipo, Arc::new(TabularSchema { tipo }));
            }
        }
        registry
    }

    pub fn registrar(&mut self, tipo: EventType, schema: Arc<dyn PayloadSchema>) {
        self.entradas.insert(tipo, schema);
    }

    pub fn resolve(&self, tipo: EventType) -> Option<Arc<dyn PayloadSchema>> {
        self.entradas.get(&tipo).cloned()
    }
}

impl Default for PayloadSchemaRegistry {
    fn default() -> Self {
        Self::padrao()
    }
}
