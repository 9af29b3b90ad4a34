// fraglog - platform/mod.rs
//
// Platform abstraction layer: config directory resolution and config.toml.
// Dependencies: standard library, directories crate.
// Must NOT depend on: core.

pub mod config;
