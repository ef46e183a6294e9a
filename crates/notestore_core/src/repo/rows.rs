//! Conversions between store records and typed model values.
//!
//! # Invariants
//! - Reads reject out-of-range tags instead of masking them.
//! - A non-system row holding a reserved folder id is malformed.
//! - Writes produced here always set `local_modified = 1`.

use crate::model::data::{DataColumns, DataContent, DataRecord, NewData};
use crate::model::ids::{NoteType, WidgetType};
use crate::model::note::{ensure_ordinary_id, NewNote, NoteRecord};
use crate::model::widget::WidgetAttribute;
use crate::repo::record_store::{Record, StoreError, StoreResult};
use rusqlite::types::Value;

/// Decodes a full `notes` row.
pub fn note_from_record(record: &Record) -> StoreResult<NoteRecord> {
    let type_value = record.get_i64("type")?;
    let kind = NoteType::from_db(type_value).ok_or_else(|| {
        StoreError::MalformedResult(format!("invalid note type `{type_value}` in notes.type"))
    })?;

    let id = record.get_i64("id")?;
    ensure_ordinary_id(id, kind)
        .map_err(|err| StoreError::MalformedResult(format!("notes row: {err}")))?;
    let widget = widget_from_record(record)?;

    Ok(NoteRecord {
        id,
        parent_id: record.get_i64("parent_id")?,
        origin_parent_id: record.get_i64("origin_parent_id")?,
        created_date: record.get_i64("created_date")?,
        modified_date: record.get_i64("modified_date")?,
        alert_date: record.get_i64("alert_date")?,
        snippet: record.get_text("snippet")?,
        widget_id: widget.widget_id,
        widget_type: widget.widget_type,
        bg_color_id: record.get_i64("bg_color_id")?,
        has_attachment: record.get_bool("has_attachment")?,
        notes_count: record.get_i64("notes_count")?,
        kind,
        sync_id: record.get_i64("sync_id")?,
        gtask_id: record.get_text("gtask_id")?,
        version: record.get_i64("version")?,
        local_modified: record.get_bool("local_modified")?,
    })
}

/// Decodes a full `data` row, including its payload variant.
pub fn data_from_record(record: &Record) -> StoreResult<DataRecord> {
    let columns = DataColumns {
        mime_type: record.get_text("mime_type")?,
        data1: record.get_opt_i64("data1")?,
        data2: record.get_opt_i64("data2")?,
        data3: record.get_opt_text("data3")?,
        data4: record.get_opt_text("data4")?,
        data5: record.get_opt_text("data5")?,
    };
    let payload = DataContent::decode(&columns)
        .map_err(|err| StoreError::MalformedResult(format!("data row: {err}")))?;

    Ok(DataRecord {
        id: record.get_i64("id")?,
        note_id: record.get_i64("note_id")?,
        content: record.get_text("content")?,
        payload,
        created_date: record.get_i64("created_date")?,
        modified_date: record.get_i64("modified_date")?,
    })
}

/// Column values inserted for a new note or folder.
pub fn new_note_values(note: &NewNote) -> Vec<(&'static str, Value)> {
    vec![
        ("parent_id", Value::Integer(note.parent_id)),
        ("type", Value::Integer(note.kind.to_db())),
        ("snippet", Value::Text(note.snippet.clone())),
        ("widget_id", Value::Integer(note.widget_id)),
        ("widget_type", Value::Integer(note.widget_type.to_db())),
        ("bg_color_id", Value::Integer(note.bg_color_id)),
        ("alert_date", Value::Integer(note.alert_date)),
        ("local_modified", Value::Integer(1)),
    ]
}

/// Column values inserted for a new data row.
pub fn new_data_values(data: &NewData) -> Vec<(&'static str, Value)> {
    let columns = data.payload.encode();
    vec![
        ("note_id", Value::Integer(data.note_id)),
        ("mime_type", Value::Text(columns.mime_type)),
        ("content", Value::Text(data.content.clone())),
        ("data1", columns.data1.into()),
        ("data2", columns.data2.into()),
        ("data3", columns.data3.into()),
        ("data4", columns.data4.into()),
        ("data5", columns.data5.into()),
    ]
}

/// Decodes the `(widget_id, widget_type)` projection of a `notes` row.
pub fn widget_from_record(record: &Record) -> StoreResult<WidgetAttribute> {
    let widget_value = record.get_i64("widget_type")?;
    let widget_type = WidgetType::from_db(widget_value).ok_or_else(|| {
        StoreError::MalformedResult(format!(
            "invalid widget type `{widget_value}` in notes.widget_type"
        ))
    })?;
    Ok(WidgetAttribute::new(record.get_i64("widget_id")?, widget_type))
}
