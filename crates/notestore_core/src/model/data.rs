//! Typed payloads for `data` rows.
//!
//! # Responsibility
//! - Replace the generic `data1..data5` columns with one variant per mime type.
//! - Encode/decode between variants and the generic column layout.
//!
//! # Invariants
//! - `mime_type` alone selects the variant; unknown mime types do not decode.
//! - `TextNote.mode` lives in `data1`; `CallNote` keeps the call timestamp in
//!   `data1` and the phone number in `data3`.

use crate::model::ids::{DataId, NoteId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mime type of a plain or checklist text payload.
pub const TEXT_NOTE_ITEM_TYPE: &str = "vnd.android.cursor.item/text_note";
/// Mime type of a call-record payload.
pub const CALL_NOTE_ITEM_TYPE: &str = "vnd.android.cursor.item/call_note";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    Plain,
    CheckList,
}

impl TextMode {
    pub fn to_db(self) -> i64 {
        match self {
            Self::Plain => 0,
            Self::CheckList => 1,
        }
    }

    pub fn from_db(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Plain),
            1 => Some(Self::CheckList),
            _ => None,
        }
    }
}

/// Payload variant of one data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataContent {
    TextNote {
        mode: TextMode,
    },
    CallNote {
        /// Epoch milliseconds of the call.
        call_date: i64,
        phone_number: String,
    },
}

/// Generic column layout shared by every payload variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataColumns {
    pub mime_type: String,
    pub data1: Option<i64>,
    pub data2: Option<i64>,
    pub data3: Option<String>,
    pub data4: Option<String>,
    pub data5: Option<String>,
}

impl DataContent {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::TextNote { .. } => TEXT_NOTE_ITEM_TYPE,
            Self::CallNote { .. } => CALL_NOTE_ITEM_TYPE,
        }
    }

    pub fn encode(&self) -> DataColumns {
        match self {
            Self::TextNote { mode } => DataColumns {
                mime_type: TEXT_NOTE_ITEM_TYPE.to_string(),
                data1: Some(mode.to_db()),
                ..DataColumns::default()
            },
            Self::CallNote {
                call_date,
                phone_number,
            } => DataColumns {
                mime_type: CALL_NOTE_ITEM_TYPE.to_string(),
                data1: Some(*call_date),
                data3: Some(phone_number.clone()),
                ..DataColumns::default()
            },
        }
    }

    /// Decodes the variant selected by `columns.mime_type`.
    ///
    /// A missing text mode reads as `Plain`; a call row without a timestamp
    /// or number is rejected.
    pub fn decode(columns: &DataColumns) -> Result<Self, DataDecodeError> {
        match columns.mime_type.as_str() {
            TEXT_NOTE_ITEM_TYPE => {
                let mode = match columns.data1 {
                    None => TextMode::Plain,
                    Some(value) => TextMode::from_db(value)
                        .ok_or(DataDecodeError::InvalidTextMode(value))?,
                };
                Ok(Self::TextNote { mode })
            }
            CALL_NOTE_ITEM_TYPE => {
                let call_date = columns
                    .data1
                    .ok_or(DataDecodeError::MissingField("data1"))?;
                let phone_number = columns
                    .data3
                    .clone()
                    .ok_or(DataDecodeError::MissingField("data3"))?;
                Ok(Self::CallNote {
                    call_date,
                    phone_number,
                })
            }
            other => Err(DataDecodeError::UnknownMimeType(other.to_string())),
        }
    }
}

/// Failure to map generic columns onto a payload variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataDecodeError {
    UnknownMimeType(String),
    InvalidTextMode(i64),
    MissingField(&'static str),
}

impl Display for DataDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMimeType(value) => write!(f, "unknown data mime type `{value}`"),
            Self::InvalidTextMode(value) => write!(f, "invalid text note mode `{value}`"),
            Self::MissingField(column) => write!(f, "data column `{column}` is missing"),
        }
    }
}

impl Error for DataDecodeError {}

/// Typed view of one `data` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRecord {
    pub id: DataId,
    pub note_id: NoteId,
    /// Note body text.
    pub content: String,
    pub payload: DataContent,
    pub created_date: i64,
    pub modified_date: i64,
}

/// Insert request for a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewData {
    pub note_id: NoteId,
    pub content: String,
    pub payload: DataContent,
}

impl NewData {
    pub fn text(note_id: NoteId, content: impl Into<String>, mode: TextMode) -> Self {
        Self {
            note_id,
            content: content.into(),
            payload: DataContent::TextNote { mode },
        }
    }

    pub fn call(
        note_id: NoteId,
        content: impl Into<String>,
        call_date: i64,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            note_id,
            content: content.into(),
            payload: DataContent::CallNote {
                call_date,
                phone_number: phone_number.into(),
            },
        }
    }
}
