//! Shared contracts for the deckhand slide assistant.
//!
//! Everything the engine and its embedders exchange lives here: the error
//! taxonomy and per-operation outcomes, image payloads and the encoding
//! normalizer, the named-action registry, the status-sink surface with a
//! JSONL status log, and the host document interface together with a
//! complete in-memory implementation.

pub mod actions;
pub mod host;
pub mod outcome;
pub mod payload;
pub mod status;
