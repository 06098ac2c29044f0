//! Memory subsystem for Falconer.
//!
//! A bounded, append-only log of typed entries that the reasoning loop uses
//! to reconstruct its conversational context: user inputs, accumulated
//! thoughts, and action/result records. Recall is recency-biased — the
//! newest matching entries win once a limit is applied.

pub mod store;

pub use store::{MemoryEntry, MemoryStore, RecallQuery};
