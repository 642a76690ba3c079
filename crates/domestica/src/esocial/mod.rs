//! eSocial event engine.
//!
//! Typed payload validation dispatched by event code, the submission
//! lifecycle state machine, attachment and cross-reference management, and
//! the coordinator that drives envelopes through the government channel.

pub mod channel;
pub mod coordinator;
pub mod domain;
pub mod lifecycle;
pub mod payload;
pub mod registry;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;
pub mod validator;
pub mod xml;

#[cfg(test)]
mod tests;

pub use channel::{EnvelopeEnvio, GovernmentChannel, ReciboEnvio, TransportError};
pub use coordinator::{SubmissionCoordinator, SubmissionError, SubmissionPolicy};
pub use domain::{
    Anexo, AnexoId, EsocialEvent, EventFilter, EventId, EventStatus, EventSummary, EventType,
    LinkKind,
};
pub use lifecycle::{ConflictError, GovernmentOutcome};
pub use payload::EventPayload;
pub use registry::PayloadSchemaRegistry;
pub use repository::{
    AttachmentStorage, EventRecord, EventRepository, RepositoryError, StorageError,
};
pub use router::esocial_router;
pub use schema::{FieldError, PayloadSchema};
pub use service::{
    AttachmentPolicy, EsocialEventService, EventServiceError, NovoAnexo, NovoEvento,
};
pub use validator::EventValidator;
