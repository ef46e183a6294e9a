//! Typed domain model for notes, folders and their data rows.
//!
//! # Responsibility
//! - Define the shared identifier space and type tags.
//! - Keep the generic storage column scheme out of application logic.
//!
//! # Invariants
//! - Every record is identified by a stable integer `NoteId`/`DataId`.
//! - Soft delete is a move into the trash folder; hard delete removes the row.

pub mod data;
pub mod ids;
pub mod note;
pub mod widget;
