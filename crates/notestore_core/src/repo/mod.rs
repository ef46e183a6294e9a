//! Repository layer: record store façade and row codecs.
//!
//! # Responsibility
//! - Define the transactional store contract used by operations.
//! - Isolate SQLite query details from folder/note orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`, `TransactionFailure`,
//!   `MalformedResult`) in addition to engine errors.

pub mod record_store;
pub mod rows;
