//! Step definitions for approval flow BDD scenarios.

mod given;
mod then;
mod when;
pub mod world;
