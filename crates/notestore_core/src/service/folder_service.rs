//! Folder/note use-case operations over the record store.
//!
//! # Responsibility
//! - Batch delete/move notes and folders as single atomic batches.
//! - Answer existence, visibility and folder-name predicates.
//! - Resolve widget bindings and call-record cross references.
//!
//! # Invariants
//! - The root folder is never hard-deleted; it is dropped from delete input.
//! - Rows moved into trash keep their prior parent in `origin_parent_id`.
//! - Every mutation sets `local_modified = 1`.
//! - No two visible folders share a name through creation or restore.
//! - Only `get_snippet_by_id` and the create/find helpers return errors;
//!   every other operation converts failures into its sentinel value.

use crate::model::data::{DataRecord, NewData, CALL_NOTE_ITEM_TYPE};
use crate::model::ids::{
    is_system_folder_id, DataId, NoteId, NoteType, ID_ROOT_FOLDER, ID_TRASH_FOLDER,
};
use crate::model::note::{NewNote, NoteRecord, NoteValidationError};
use crate::model::widget::WidgetAttribute;
use crate::repo::record_store::{
    Assignment, BatchOp, Condition, RecordQuery, RecordStore, SortOrder, StoreError, Table,
};
use crate::repo::rows::{
    data_from_record, new_data_values, new_note_values, note_from_record, widget_from_record,
};
use crate::telephony::phone_numbers_equal;
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from folder/note operations that report failure explicitly.
#[derive(Debug)]
pub enum ServiceError {
    /// No `notes` row with this id.
    NotFound(NoteId),
    /// Insert request violates a record invariant.
    InvalidNote(NoteValidationError),
    /// A visible folder already uses this name.
    DuplicateFolderName(String),
    /// Parent is neither a usable system folder nor a visible folder.
    InvalidParent(NoteId),
    /// Data rows can only be attached to plain notes.
    NotANote(NoteId),
    /// Record store failure.
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note is not found with id: {id}"),
            Self::InvalidNote(err) => write!(f, "{err}"),
            Self::DuplicateFolderName(name) => write!(f, "folder name already in use: `{name}`"),
            Self::InvalidParent(id) => write!(f, "invalid parent folder: {id}"),
            Self::NotANote(id) => write!(f, "record is not a note: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidNote(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound {
                table: Table::Notes,
                id,
            } => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<NoteValidationError> for ServiceError {
    fn from(value: NoteValidationError) -> Self {
        Self::InvalidNote(value)
    }
}

/// Folder/note operations facade over a record store.
pub struct NoteFolderService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> NoteFolderService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Hard-deletes the given records in one atomic batch.
    ///
    /// Empty input succeeds without touching storage. The root folder id is
    /// dropped from the input and logged. Returns `false` when the batch is
    /// rejected or produces no results (for example when only the root id was
    /// given).
    pub fn batch_delete_notes<I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = NoteId>,
    {
        let ids: BTreeSet<NoteId> = ids.into_iter().collect();
        if ids.is_empty() {
            debug!("event=batch_delete module=notes status=skip reason=empty_ids");
            return true;
        }

        let mut ops = Vec::with_capacity(ids.len());
        for id in &ids {
            if *id == ID_ROOT_FOLDER {
                warn!("event=batch_delete module=notes status=skip reason=root_folder id={id}");
                continue;
            }
            ops.push(BatchOp::delete(Table::Notes, *id));
        }

        self.commit_batch("batch_delete", ids.len(), &ops)
    }

    /// Moves one record and records `src_folder_id` as its origin.
    ///
    /// Single statement, not batched. Failures are logged only; callers that
    /// need confirmation must read the record back.
    pub fn move_note_to_folder(&self, id: NoteId, src_folder_id: NoteId, des_folder_id: NoteId) {
        let assignments = [
            Assignment::set("parent_id", des_folder_id),
            Assignment::set("origin_parent_id", src_folder_id),
            Assignment::set("local_modified", 1_i64),
        ];
        match self.store.update(Table::Notes, id, &assignments) {
            Ok(0) => warn!("event=move_note module=notes status=skip reason=not_found id={id}"),
            Ok(_) => debug!(
                "event=move_note module=notes status=ok id={id} from={src_folder_id} to={des_folder_id}"
            ),
            Err(err) => error!("event=move_note module=notes status=error id={id} error={err}"),
        }
    }

    /// Re-parents the given records under `folder_id` in one atomic batch.
    ///
    /// No system folder protection applies here: any id, the root folder
    /// included, may be moved. When the target is the trash folder, rows not
    /// already in trash also get `origin_parent_id` set to their prior parent.
    pub fn batch_move_to_folder<I>(&self, ids: I, folder_id: NoteId) -> bool
    where
        I: IntoIterator<Item = NoteId>,
    {
        let ids: BTreeSet<NoteId> = ids.into_iter().collect();
        if ids.is_empty() {
            debug!("event=batch_move module=notes status=skip reason=empty_ids");
            return true;
        }

        let ops = ids
            .iter()
            .map(|id| {
                let mut assignments = vec![
                    Assignment::set("parent_id", folder_id),
                    Assignment::set("local_modified", 1_i64),
                ];
                if folder_id == ID_TRASH_FOLDER {
                    assignments.push(Assignment::copy_from("origin_parent_id", "parent_id"));
                    BatchOp::update(Table::Notes, *id, assignments)
                        .when(Condition::ne("parent_id", ID_TRASH_FOLDER))
                } else {
                    BatchOp::update(Table::Notes, *id, assignments)
                }
            })
            .collect::<Vec<_>>();

        self.commit_batch("batch_move", ids.len(), &ops)
    }

    /// Counts user folders outside the trash.
    ///
    /// Returns 0 when the count cannot be read.
    pub fn get_user_folder_count(&self) -> usize {
        let query = RecordQuery::new(Table::Notes)
            .filter_eq("type", NoteType::Folder.to_db())
            .filter_ne("parent_id", ID_TRASH_FOLDER);
        match self.store.count(&query) {
            Ok(count) => usize::try_from(count).unwrap_or(0),
            Err(err) => {
                error!("event=folder_count module=notes status=error error={err}");
                0
            }
        }
    }

    /// Returns whether `note_id` exists with `kind` and is not in trash.
    pub fn visible_in_note_database(&self, note_id: NoteId, kind: NoteType) -> bool {
        let query = RecordQuery::new(Table::Notes)
            .filter_eq("id", note_id)
            .filter_eq("type", kind.to_db())
            .filter_ne("parent_id", ID_TRASH_FOLDER);
        self.any_match("visible_note", &query)
    }

    /// Returns whether a `notes` row with this id exists, trashed or not.
    pub fn exist_in_note_database(&self, note_id: NoteId) -> bool {
        let query = RecordQuery::new(Table::Notes).filter_eq("id", note_id);
        self.any_match("note_exists", &query)
    }

    /// Returns whether a `data` row with this id exists.
    pub fn exist_in_data_database(&self, data_id: DataId) -> bool {
        let query = RecordQuery::new(Table::Data).filter_eq("id", data_id);
        self.any_match("data_exists", &query)
    }

    /// Returns whether a visible folder already uses exactly `name`.
    pub fn check_visible_folder_name(&self, name: &str) -> bool {
        let query = RecordQuery::new(Table::Notes)
            .filter_eq("type", NoteType::Folder.to_db())
            .filter_ne("parent_id", ID_TRASH_FOLDER)
            .filter_eq("snippet", name.to_string());
        self.any_match("folder_name_check", &query)
    }

    /// Collects distinct widget bindings of the records in `folder_id`.
    ///
    /// `None` means the query failed; `Some` with an empty set means the
    /// folder has no records. Rows whose widget fields cannot be decoded are
    /// logged and skipped.
    pub fn get_folder_note_widget(&self, folder_id: NoteId) -> Option<HashSet<WidgetAttribute>> {
        let query = RecordQuery::new(Table::Notes)
            .columns(&["widget_id", "widget_type"])
            .filter_eq("parent_id", folder_id);

        let mut widgets = HashSet::new();
        let scanned = self.store.query_each(&query, &mut |record| {
            match widget_from_record(&record) {
                Ok(widget) => {
                    widgets.insert(widget);
                }
                Err(err) => warn!(
                    "event=folder_widgets module=notes status=skip folder_id={folder_id} error={err}"
                ),
            }
            ControlFlow::Continue(())
        });

        match scanned {
            Ok(()) => {
                debug!(
                    "event=folder_widgets module=notes status=ok folder_id={folder_id} widgets={} bound={}",
                    widgets.len(),
                    widgets.iter().filter(|widget| widget.is_bound()).count()
                );
                Some(widgets)
            }
            Err(err) => {
                error!(
                    "event=folder_widgets module=notes status=error folder_id={folder_id} error={err}"
                );
                None
            }
        }
    }

    /// Returns the phone number of the call record attached to `note_id`.
    ///
    /// Returns an empty string when there is none or it cannot be read.
    pub fn get_call_number_by_note_id(&self, note_id: NoteId) -> String {
        let query = RecordQuery::new(Table::Data)
            .columns(&["data3"])
            .filter_eq("note_id", note_id)
            .filter_eq("mime_type", CALL_NOTE_ITEM_TYPE.to_string())
            .limit(1);

        let records = match self.store.query(&query) {
            Ok(records) => records,
            Err(err) => {
                error!("event=call_number module=notes status=error note_id={note_id} error={err}");
                return String::new();
            }
        };

        match records.first().map(|record| record.get_opt_text("data3")) {
            Some(Ok(Some(number))) => number,
            Some(Ok(None)) | None => String::new(),
            Some(Err(err)) => {
                warn!("event=call_number module=notes status=error note_id={note_id} error={err}");
                String::new()
            }
        }
    }

    /// Finds the note holding the call record for `phone_number` at `call_date`.
    ///
    /// Numbers are compared with [`phone_numbers_equal`]. Returns 0 when no
    /// record matches.
    pub fn get_note_id_by_phone_number_and_call_date(
        &self,
        phone_number: &str,
        call_date: i64,
    ) -> NoteId {
        let query = RecordQuery::new(Table::Data)
            .columns(&["note_id", "data3"])
            .filter_eq("data1", call_date)
            .filter_eq("mime_type", CALL_NOTE_ITEM_TYPE.to_string())
            .order_by("id", SortOrder::Asc);

        let mut found = None;
        let scanned = self.store.query_each(&query, &mut |record| {
            let candidate = record
                .get_opt_text("data3")
                .and_then(|number| Ok((record.get_i64("note_id")?, number)));
            match candidate {
                Ok((note_id, Some(number))) if phone_numbers_equal(&number, phone_number) => {
                    found = Some(note_id);
                    ControlFlow::Break(())
                }
                Ok(_) => ControlFlow::Continue(()),
                Err(err) => {
                    warn!("event=call_note_lookup module=notes status=skip error={err}");
                    ControlFlow::Continue(())
                }
            }
        });

        if let Err(err) = scanned {
            error!("event=call_note_lookup module=notes status=error error={err}");
            return 0;
        }
        found.unwrap_or(0)
    }

    /// Returns the stored snippet of one note or folder.
    ///
    /// # Errors
    /// - `NotFound` when no record has this id.
    /// - `Store` when the engine fails or the snippet is unreadable.
    pub fn get_snippet_by_id(&self, note_id: NoteId) -> ServiceResult<String> {
        let query = RecordQuery::new(Table::Notes)
            .columns(&["snippet"])
            .filter_eq("id", note_id)
            .limit(1);
        let records = self.store.query(&query)?;
        let record = records.first().ok_or(ServiceError::NotFound(note_id))?;
        Ok(record.get_text("snippet")?)
    }

    /// Creates a user folder under the root folder.
    ///
    /// # Errors
    /// - `InvalidNote` when the trimmed name is blank.
    /// - `DuplicateFolderName` when a visible folder already uses the name.
    pub fn create_folder(&self, name: &str) -> ServiceResult<NoteId> {
        self.create_record(NewNote::folder(ID_ROOT_FOLDER, name.trim()))
    }

    /// Creates a plain note under a visible folder or a non-trash system folder.
    pub fn create_note(&self, parent_id: NoteId, snippet: &str) -> ServiceResult<NoteId> {
        self.create_record(NewNote::note(parent_id, snippet))
    }

    /// Creates a note or folder from a prepared insert request.
    ///
    /// # Errors
    /// - `InvalidNote` when the request violates a record invariant.
    /// - `InvalidParent` when the parent is not a usable folder.
    /// - `DuplicateFolderName` when a folder's name is already visible.
    pub fn create_record(&self, note: NewNote) -> ServiceResult<NoteId> {
        note.validate()?;
        if !self.is_usable_folder(note.parent_id) {
            return Err(ServiceError::InvalidParent(note.parent_id));
        }
        if note.kind == NoteType::Folder && self.check_visible_folder_name(&note.snippet) {
            return Err(ServiceError::DuplicateFolderName(note.snippet));
        }
        let id = self.insert_one(Table::Notes, &new_note_values(&note))?;
        debug!(
            "event=note_create module=notes status=ok id={id} parent_id={}",
            note.parent_id
        );
        Ok(id)
    }

    /// Attaches a data row to an existing plain note.
    ///
    /// # Errors
    /// - `NotFound` when the note does not exist.
    /// - `NotANote` when the target is a folder or system folder.
    pub fn attach_data(&self, data: &NewData) -> ServiceResult<DataId> {
        let note = self.find_note(data.note_id)?.ok_or(ServiceError::NotFound(data.note_id))?;
        if note.kind != NoteType::Note {
            return Err(ServiceError::NotANote(note.id));
        }
        self.insert_one(Table::Data, &new_data_values(data))
    }

    /// Loads one record, or `None` when it does not exist.
    pub fn find_note(&self, note_id: NoteId) -> ServiceResult<Option<NoteRecord>> {
        match self.store.get(Table::Notes, note_id) {
            Ok(record) => Ok(Some(note_from_record(&record)?)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists data rows attached to one note, oldest first.
    pub fn list_note_data(&self, note_id: NoteId) -> ServiceResult<Vec<DataRecord>> {
        let query = RecordQuery::new(Table::Data)
            .filter_eq("note_id", note_id)
            .order_by("id", SortOrder::Asc);
        let records = self.store.query(&query)?;
        records
            .iter()
            .map(|record| data_from_record(record).map_err(ServiceError::from))
            .collect()
    }

    /// Moves trashed records back to where they came from, in one batch.
    ///
    /// A record returns to `origin_parent_id` when that is still a visible
    /// folder or a non-trash system folder, otherwise to the root folder.
    /// Ids that are missing or not in trash are skipped, as are folders whose
    /// name is already used by a visible folder or by an earlier folder in the
    /// same call. Returns `false` when nothing was eligible or the batch failed.
    pub fn restore_from_trash<I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = NoteId>,
    {
        let ids: BTreeSet<NoteId> = ids.into_iter().collect();
        if ids.is_empty() {
            debug!("event=restore module=notes status=skip reason=empty_ids");
            return true;
        }

        let mut ops = Vec::with_capacity(ids.len());
        let mut restored_names = HashSet::new();
        for id in &ids {
            let note = match self.find_note(*id) {
                Ok(Some(note)) if note.is_in_trash() => note,
                Ok(_) => {
                    debug!("event=restore module=notes status=skip reason=not_in_trash id={id}");
                    continue;
                }
                Err(err) => {
                    error!("event=restore module=notes status=error id={id} error={err}");
                    return false;
                }
            };

            if note.is_folder()
                && (self.check_visible_folder_name(&note.snippet)
                    || !restored_names.insert(note.snippet.clone()))
            {
                warn!("event=restore module=notes status=skip reason=duplicate_folder_name id={id}");
                continue;
            }

            let target = if self.is_usable_folder(note.origin_parent_id) {
                note.origin_parent_id
            } else {
                ID_ROOT_FOLDER
            };
            ops.push(
                BatchOp::update(
                    Table::Notes,
                    note.id,
                    vec![
                        Assignment::set("parent_id", target),
                        Assignment::set("local_modified", 1_i64),
                    ],
                )
                .when(Condition::eq("parent_id", ID_TRASH_FOLDER)),
            );
        }

        self.commit_batch("restore", ids.len(), &ops)
    }

    fn is_usable_folder(&self, folder_id: NoteId) -> bool {
        if folder_id == ID_TRASH_FOLDER {
            return false;
        }
        is_system_folder_id(folder_id) || self.visible_in_note_database(folder_id, NoteType::Folder)
    }

    fn insert_one(&self, table: Table, values: &[(&'static str, Value)]) -> ServiceResult<i64> {
        Ok(self.store.insert(table, values)?)
    }

    fn any_match(&self, event: &'static str, query: &RecordQuery) -> bool {
        match self.store.count(query) {
            Ok(count) => count > 0,
            Err(err) => {
                error!("event={event} module=notes status=error error={err}");
                false
            }
        }
    }

    fn commit_batch(&self, event: &'static str, requested: usize, ops: &[BatchOp]) -> bool {
        match self.store.apply_batch(ops) {
            Ok(result) if result.is_empty() => {
                warn!(
                    "event={event} module=notes status=error reason=empty_result requested={requested}"
                );
                false
            }
            Ok(result) => {
                info!(
                    "event={event} module=notes status=ok requested={requested} ops={} affected={}",
                    result.len(),
                    result.total_affected()
                );
                true
            }
            Err(err) => {
                error!("event={event} module=notes status=error requested={requested} error={err}");
                false
            }
        }
    }
}

/// Renders a snippet as a single-line preview.
///
/// Trims surrounding whitespace, then cuts at the first newline.
pub fn get_formatted_snippet(snippet: &str) -> String {
    let trimmed = snippet.trim();
    match trimmed.find('\n') {
        Some(index) => trimmed[..index].to_string(),
        None => trimmed.to_string(),
    }
}
