//! Taskflow: a multi-tenant workflow engine for task status transitions.
//!
//! The engine resolves which statuses an actor may use, which workflow
//! template governs their board, and whether a requested status change runs
//! immediately or waits for an approval. Every mutation leaves exactly one
//! audit entry.
//!
//! # Architecture
//!
//! Taskflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage, audit and notification
//! - **Adapters**: Concrete implementations of ports (in-memory stores)
//! - **Services**: Orchestration over injected ports
//!
//! # Modules
//!
//! - [`workflow`]: status catalog, templates, settings, transitions and approvals
//! - [`api`]: framework-agnostic handlers returning the response envelope
//! - [`config`]: layered engine configuration
//! - [`telemetry`]: tracing subscriber set-up

pub mod api;
pub mod config;
pub mod telemetry;
pub mod workflow;
