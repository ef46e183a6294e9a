//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record store calls into folder/note operations.
//! - Keep UI layers decoupled from storage details.

pub mod folder_service;
