//! Test helpers shared across crates in the workspace.
//!
//! * [`env`] serialises process environment mutations behind RAII guards so
//!   environment-backed sources can be exercised deterministically.
//! * [`gate`] provides a blocking latch used to hold a collaborator (such as a
//!   snapshot fetch) in flight while a test inspects concurrent behaviour.

pub mod env;
pub mod gate;
