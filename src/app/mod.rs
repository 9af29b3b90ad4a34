// fraglog - app/mod.rs
//
// Application layer: orchestration of the ingestion pipeline.
// Dependencies: core layer.
// Must NOT depend on: platform specifics.

pub mod ingest;
