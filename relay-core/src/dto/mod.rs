//! Data Transfer Objects for the orchestrator API
//!
//! Request bodies sent to the orchestrator's command endpoints. Responses are
//! read field by field by the backend, since the identifier lives at a
//! different path depending on the endpoint.

pub mod command;
