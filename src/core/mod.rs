// fraglog - core/mod.rs
//
// Core business logic layer: classification, match state, digestion,
// line gathering, and report rendering.
// Must NOT depend on: app or platform.

pub mod digester;
pub mod event;
pub mod gatherer;
pub mod model;
pub mod report;
