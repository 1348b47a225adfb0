//! JSON-over-HTTP surface of the workflow engine, independent of any web
//! framework.
//!
//! Handlers take the authenticated [`Actor`](crate::workflow::domain::Actor)
//! and decoded request types from [`dto`], and answer with the uniform
//! [`ApiResponse`] envelope. Routing, authentication and body decoding belong
//! to the embedding server.

pub mod dto;
mod envelope;
mod handlers;

pub use envelope::{ApiError, ApiResponse};
pub use handlers::WorkflowApi;
