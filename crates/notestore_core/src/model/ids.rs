//! Identifier space and type tags shared by notes, folders and data rows.
//!
//! # Responsibility
//! - Define the reserved system folder ids and the numeric type tags stored
//!   in `notes.type` and `notes.widget_type`.
//! - Convert tags to and from their storage integers.
//!
//! # Invariants
//! - Values are compile-time constants and must stay stable across releases;
//!   they are persisted in every database.
//! - Ordinary (non-system) records never use a reserved id.

use serde::{Deserialize, Serialize};

/// Row id in the `notes` table (notes, folders and system folders).
pub type NoteId = i64;

/// Row id in the `data` table.
pub type DataId = i64;

/// Root folder. Always exists and can never be hard-deleted.
pub const ID_ROOT_FOLDER: NoteId = 0;
/// Temporary folder for notes that do not belong to any folder yet.
pub const ID_TEMPORARY_FOLDER: NoteId = -1;
/// Folder that collects call-record notes.
pub const ID_CALL_RECORD_FOLDER: NoteId = -2;
/// Trash folder. Moving a record here is the user-visible delete.
pub const ID_TRASH_FOLDER: NoteId = -3;

/// Closed set of reserved folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemFolder {
    Root,
    Temporary,
    CallRecord,
    Trash,
}

impl SystemFolder {
    pub const ALL: [SystemFolder; 4] = [
        SystemFolder::Root,
        SystemFolder::Temporary,
        SystemFolder::CallRecord,
        SystemFolder::Trash,
    ];

    pub fn id(self) -> NoteId {
        match self {
            Self::Root => ID_ROOT_FOLDER,
            Self::Temporary => ID_TEMPORARY_FOLDER,
            Self::CallRecord => ID_CALL_RECORD_FOLDER,
            Self::Trash => ID_TRASH_FOLDER,
        }
    }

    pub fn from_id(id: NoteId) -> Option<Self> {
        Self::ALL.into_iter().find(|folder| folder.id() == id)
    }
}

/// Returns whether `id` is one of the reserved system folder ids.
pub fn is_system_folder_id(id: NoteId) -> bool {
    SystemFolder::from_id(id).is_some()
}

/// Record kind stored in `notes.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    /// Plain note carrying one or more data rows.
    Note,
    /// User folder; its `snippet` is the folder name.
    Folder,
    /// One of the reserved system folders.
    System,
}

impl NoteType {
    pub fn to_db(self) -> i64 {
        match self {
            Self::Note => 0,
            Self::Folder => 1,
            Self::System => 2,
        }
    }

    pub fn from_db(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Note),
            1 => Some(Self::Folder),
            2 => Some(Self::System),
            _ => None,
        }
    }
}

/// Home-screen widget size bound to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    /// No widget attached.
    Invalid,
    Small,
    Large,
}

impl WidgetType {
    pub fn to_db(self) -> i64 {
        match self {
            Self::Invalid => -1,
            Self::Small => 0,
            Self::Large => 1,
        }
    }

    pub fn from_db(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Invalid),
            0 => Some(Self::Small),
            1 => Some(Self::Large),
            _ => None,
        }
    }
}
