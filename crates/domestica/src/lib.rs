//! Domain library for the household-employer compliance service.
//!
//! The heart of the crate is the [`esocial`] module: typed payload validation
//! for government labor events, the submission lifecycle state machine, and
//! the coordinator that drives events through the external eSocial channel.

pub mod config;
pub mod error;
pub mod esocial;
pub mod telemetry;
