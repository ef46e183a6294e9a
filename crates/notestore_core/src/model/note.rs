//! Note and folder records.
//!
//! # Responsibility
//! - Define the typed read model for one `notes` row.
//! - Define the insert request used by folder/note creation paths.
//!
//! # Invariants
//! - New records never claim a reserved system folder id or `System` type.
//! - Folder names are non-blank after trimming.
//! - A record is visible iff its `parent_id` is not the trash folder.

use crate::model::ids::{is_system_folder_id, NoteId, NoteType, WidgetType, ID_TRASH_FOLDER};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Typed view of one `notes` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub parent_id: NoteId,
    /// Parent before the last move into trash.
    pub origin_parent_id: NoteId,
    /// Epoch milliseconds.
    pub created_date: i64,
    /// Epoch milliseconds.
    pub modified_date: i64,
    /// Epoch milliseconds, `0` when no alert is set.
    pub alert_date: i64,
    /// Folder name for folders, text preview for notes.
    pub snippet: String,
    pub widget_id: i64,
    pub widget_type: WidgetType,
    pub bg_color_id: i64,
    pub has_attachment: bool,
    /// Cached child note count. Meaningful for folders only.
    pub notes_count: i64,
    #[serde(rename = "type")]
    pub kind: NoteType,
    pub sync_id: i64,
    pub gtask_id: String,
    pub version: i64,
    pub local_modified: bool,
}

impl NoteRecord {
    pub fn is_in_trash(&self) -> bool {
        self.parent_id == ID_TRASH_FOLDER
    }

    /// Visible means not sitting directly in the trash folder.
    pub fn is_visible(&self) -> bool {
        !self.is_in_trash()
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NoteType::Folder
    }
}

/// Insert request for a note or user folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub parent_id: NoteId,
    pub kind: NoteType,
    pub snippet: String,
    pub widget_id: i64,
    pub widget_type: WidgetType,
    pub bg_color_id: i64,
    pub alert_date: i64,
}

impl NewNote {
    /// Creates a plain note under `parent_id` with no widget attached.
    pub fn note(parent_id: NoteId, snippet: impl Into<String>) -> Self {
        Self {
            parent_id,
            kind: NoteType::Note,
            snippet: snippet.into(),
            widget_id: 0,
            widget_type: WidgetType::Invalid,
            bg_color_id: 0,
            alert_date: 0,
        }
    }

    /// Creates a user folder under `parent_id`.
    pub fn folder(parent_id: NoteId, name: impl Into<String>) -> Self {
        Self {
            kind: NoteType::Folder,
            ..Self::note(parent_id, name)
        }
    }

    /// Binds a home-screen widget to the new record.
    pub fn with_widget(mut self, widget_id: i64, widget_type: WidgetType) -> Self {
        self.widget_id = widget_id;
        self.widget_type = widget_type;
        self
    }

    /// Checks insert-time invariants.
    ///
    /// # Errors
    /// - `SystemTypeNotAllowed` when `kind` is `System`.
    /// - `BlankFolderName` when a folder name is empty after trim.
    /// - `ParentInTrash` when the parent is the trash folder.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.kind == NoteType::System {
            return Err(NoteValidationError::SystemTypeNotAllowed);
        }
        if self.kind == NoteType::Folder && self.snippet.trim().is_empty() {
            return Err(NoteValidationError::BlankFolderName);
        }
        if self.parent_id == ID_TRASH_FOLDER {
            return Err(NoteValidationError::ParentInTrash);
        }
        Ok(())
    }
}

/// Validation failures for records crossing into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    SystemTypeNotAllowed,
    BlankFolderName,
    ParentInTrash,
    /// An ordinary record claims a reserved id.
    ReservedId(NoteId),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SystemTypeNotAllowed => write!(f, "system records cannot be created"),
            Self::BlankFolderName => write!(f, "folder name must not be blank"),
            Self::ParentInTrash => write!(f, "new records cannot be created in trash"),
            Self::ReservedId(id) => write!(f, "id {id} is reserved for a system folder"),
        }
    }
}

impl Error for NoteValidationError {}

/// Rejects reserved ids on records that are not system folders.
pub fn ensure_ordinary_id(id: NoteId, kind: NoteType) -> Result<(), NoteValidationError> {
    if kind != NoteType::System && is_system_folder_id(id) {
        return Err(NoteValidationError::ReservedId(id));
    }
    Ok(())
}
