//! Workflow and status-transition engine.
//!
//! Governs how a task moves between statuses: which statuses an actor sees,
//! which template's columns apply, when a move needs an approval, and the
//! audit trail every mutation leaves. The module follows hexagonal
//! architecture:
//!
//! - Domain types and pure decisions in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
