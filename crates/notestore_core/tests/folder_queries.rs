use notestore_core::db::{open_db_in_memory, DbError};
use notestore_core::{
    Assignment, BatchOp, BatchResult, NewData, NewNote, NoteFolderService, NoteId, NoteType,
    NoteValidationError, Record, RecordQuery, RecordStore, ServiceError, SqliteRecordStore,
    StoreError, StoreResult, Table, TextMode, WidgetAttribute, WidgetType, ID_CALL_RECORD_FOLDER,
    ID_ROOT_FOLDER, ID_TEMPORARY_FOLDER, ID_TRASH_FOLDER,
};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::HashSet;
use std::ops::ControlFlow;

fn service(conn: &Connection) -> NoteFolderService<SqliteRecordStore<'_>> {
    NoteFolderService::new(SqliteRecordStore::new(conn))
}

/// Store whose every call fails at the engine level.
struct BrokenStore;

fn engine_failure() -> StoreError {
    StoreError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery))
}

impl RecordStore for BrokenStore {
    fn get(&self, _table: Table, _id: i64) -> StoreResult<Record> {
        Err(engine_failure())
    }

    fn query_each(
        &self,
        _query: &RecordQuery,
        _visit: &mut dyn FnMut(Record) -> ControlFlow<()>,
    ) -> StoreResult<()> {
        Err(engine_failure())
    }

    fn count(&self, _query: &RecordQuery) -> StoreResult<i64> {
        Err(engine_failure())
    }

    fn insert(&self, _table: Table, _values: &[(&'static str, Value)]) -> StoreResult<i64> {
        Err(engine_failure())
    }

    fn update(&self, _table: Table, _id: i64, _assignments: &[Assignment]) -> StoreResult<usize> {
        Err(engine_failure())
    }

    fn apply_batch(&self, _ops: &[BatchOp]) -> StoreResult<BatchResult> {
        Err(engine_failure())
    }
}

#[test]
fn user_folder_count_ignores_system_folders_notes_and_trash() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    assert_eq!(service.get_user_folder_count(), 0);

    let work = service.create_folder("Work").unwrap();
    service.create_folder("Home").unwrap();
    service.create_note(ID_ROOT_FOLDER, "loose note").unwrap();
    assert_eq!(service.get_user_folder_count(), 2);

    assert!(service.batch_move_to_folder([work], ID_TRASH_FOLDER));
    assert_eq!(service.get_user_folder_count(), 1);
}

#[test]
fn visibility_depends_on_type_and_trash() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let id = service.create_note(folder, "draft").unwrap();

    assert!(service.visible_in_note_database(id, NoteType::Note));
    assert!(!service.visible_in_note_database(id, NoteType::Folder));
    assert!(service.visible_in_note_database(folder, NoteType::Folder));
    assert!(service.visible_in_note_database(ID_ROOT_FOLDER, NoteType::System));
    assert!(!service.visible_in_note_database(4242, NoteType::Note));

    assert!(service.batch_move_to_folder([id], ID_TRASH_FOLDER));
    assert!(!service.visible_in_note_database(id, NoteType::Note));
    assert!(service.exist_in_note_database(id));
}

#[test]
fn existence_checks_cover_notes_and_data() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create_note(ID_ROOT_FOLDER, "draft").unwrap();
    let data = service
        .attach_data(&NewData::text(id, "body", TextMode::Plain))
        .unwrap();

    assert!(service.exist_in_note_database(id));
    assert!(service.exist_in_note_database(ID_TRASH_FOLDER));
    assert!(service.exist_in_data_database(data));
    assert!(!service.exist_in_data_database(data + 1));

    assert!(service.batch_delete_notes([id]));
    assert!(!service.exist_in_note_database(id));
    assert!(!service.exist_in_data_database(data));
}

#[test]
fn folder_name_check_only_sees_visible_folders() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    service.create_note(ID_ROOT_FOLDER, "Notes").unwrap();

    assert!(service.check_visible_folder_name("Work"));
    assert!(!service.check_visible_folder_name("work"));
    assert!(!service.check_visible_folder_name("Notes"));

    assert!(service.batch_move_to_folder([folder], ID_TRASH_FOLDER));
    assert!(!service.check_visible_folder_name("Work"));
}

#[test]
fn create_folder_rejects_blank_and_duplicate_names() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(matches!(
        service.create_folder("   "),
        Err(ServiceError::InvalidNote(NoteValidationError::BlankFolderName))
    ));

    let first = service.create_folder(" Work ").unwrap();
    assert_eq!(service.get_snippet_by_id(first).unwrap(), "Work");
    match service.create_folder("Work") {
        Err(ServiceError::DuplicateFolderName(name)) => assert_eq!(name, "Work"),
        other => panic!("unexpected result: {other:?}"),
    }

    // The name frees up once the original is trashed.
    assert!(service.batch_move_to_folder([first], ID_TRASH_FOLDER));
    let second = service.create_folder("Work").unwrap();
    assert_ne!(first, second);
}

#[test]
fn create_record_rejects_duplicate_visible_folder_name() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.create_folder("Work").unwrap();

    match service.create_record(NewNote::folder(ID_ROOT_FOLDER, "Work")) {
        Err(ServiceError::DuplicateFolderName(name)) => assert_eq!(name, "Work"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(service.get_user_folder_count(), 1);

    // Notes may reuse a folder name.
    assert!(service.create_note(ID_ROOT_FOLDER, "Work").is_ok());
}

#[test]
fn restore_from_trash_skips_folders_whose_name_is_taken() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let trashed = service.create_folder("Work").unwrap();
    assert!(service.batch_move_to_folder([trashed], ID_TRASH_FOLDER));
    let replacement = service.create_folder("Work").unwrap();

    assert!(!service.restore_from_trash([trashed]));
    assert_eq!(
        service.find_note(trashed).unwrap().unwrap().parent_id,
        ID_TRASH_FOLDER
    );
    assert!(service.visible_in_note_database(replacement, NoteType::Folder));
    assert_eq!(service.get_user_folder_count(), 1);
}

#[test]
fn restore_from_trash_brings_back_one_of_two_same_named_folders() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let first = service.create_folder("Work").unwrap();
    assert!(service.batch_move_to_folder([first], ID_TRASH_FOLDER));
    let second = service.create_folder("Work").unwrap();
    assert!(service.batch_move_to_folder([second], ID_TRASH_FOLDER));

    assert!(service.restore_from_trash([first, second]));
    assert_eq!(service.get_user_folder_count(), 1);
    assert!(service.visible_in_note_database(first, NoteType::Folder));
    assert!(!service.visible_in_note_database(second, NoteType::Folder));
}

#[test]
fn create_record_validates_parent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let plain = service.create_note(folder, "plain").unwrap();

    assert!(service.create_note(ID_TEMPORARY_FOLDER, "scratch").is_ok());
    assert!(service.create_note(ID_CALL_RECORD_FOLDER, "call").is_ok());
    assert!(matches!(
        service.create_note(ID_TRASH_FOLDER, "nope"),
        Err(ServiceError::InvalidNote(NoteValidationError::ParentInTrash))
    ));
    assert!(matches!(
        service.create_note(4242, "orphan"),
        Err(ServiceError::InvalidParent(4242))
    ));
    assert!(matches!(
        service.create_note(plain, "nested"),
        Err(ServiceError::InvalidParent(id)) if id == plain
    ));

    let mut system = NewNote::folder(ID_ROOT_FOLDER, "System");
    system.kind = NoteType::System;
    assert!(matches!(
        service.create_record(system),
        Err(ServiceError::InvalidNote(NoteValidationError::SystemTypeNotAllowed))
    ));
}

#[test]
fn folder_widgets_are_distinct_per_folder() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Widgets").unwrap();
    for note in [
        NewNote::note(folder, "a").with_widget(7, WidgetType::Small),
        NewNote::note(folder, "b").with_widget(7, WidgetType::Small),
        NewNote::note(folder, "c").with_widget(9, WidgetType::Large),
        NewNote::note(folder, "d"),
        NewNote::note(ID_ROOT_FOLDER, "elsewhere").with_widget(11, WidgetType::Large),
    ] {
        service.create_record(note).unwrap();
    }

    let widgets = service.get_folder_note_widget(folder).unwrap();
    let expected = [
        WidgetAttribute::new(7, WidgetType::Small),
        WidgetAttribute::new(9, WidgetType::Large),
        WidgetAttribute::new(0, WidgetType::Invalid),
    ]
    .into_iter()
    .collect::<HashSet<_>>();
    assert_eq!(widgets, expected);
    assert_eq!(widgets.iter().filter(|widget| widget.is_bound()).count(), 2);

    let empty = service.create_folder("Empty").unwrap();
    assert_eq!(service.get_folder_note_widget(empty), Some(HashSet::new()));
}

#[test]
fn snippet_lookup_returns_stored_text_or_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service
        .create_note(ID_ROOT_FOLDER, "  first line\nsecond line")
        .unwrap();

    assert_eq!(
        service.get_snippet_by_id(id).unwrap(),
        "  first line\nsecond line"
    );
    assert_eq!(service.get_snippet_by_id(ID_ROOT_FOLDER).unwrap(), "");

    let err = service.get_snippet_by_id(4242).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(4242)));
    assert_eq!(err.to_string(), "note is not found with id: 4242");
}

#[test]
fn find_note_exposes_typed_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();

    let record = service.find_note(folder).unwrap().unwrap();
    assert!(record.is_folder());
    assert!(record.is_visible());
    assert!(record.local_modified);
    assert_eq!(record.parent_id, ID_ROOT_FOLDER);
    assert_eq!(record.snippet, "Work");

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "folder");
    assert_eq!(json["widget_type"], "invalid");

    assert_eq!(service.find_note(4242).unwrap(), None);
}

#[test]
fn ordinary_row_on_reserved_id_is_malformed() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    conn.execute("UPDATE notes SET type = 1 WHERE id = ?1;", [ID_TEMPORARY_FOLDER])
        .unwrap();

    assert!(matches!(
        service.find_note(ID_TEMPORARY_FOLDER),
        Err(ServiceError::Store(StoreError::MalformedResult(_)))
    ));
}

#[test]
fn failing_store_yields_sentinels() {
    let service = NoteFolderService::new(BrokenStore);
    let ids: [NoteId; 1] = [1];

    assert!(!service.batch_delete_notes(ids));
    assert!(!service.batch_move_to_folder(ids, ID_TRASH_FOLDER));
    assert!(!service.restore_from_trash(ids));
    service.move_note_to_folder(1, ID_ROOT_FOLDER, ID_TRASH_FOLDER);

    assert_eq!(service.get_user_folder_count(), 0);
    assert!(!service.visible_in_note_database(1, NoteType::Note));
    assert!(!service.exist_in_note_database(1));
    assert!(!service.exist_in_data_database(1));
    assert!(!service.check_visible_folder_name("Work"));
    assert_eq!(service.get_folder_note_widget(1), None);
    assert_eq!(service.get_call_number_by_note_id(1), "");
    assert_eq!(
        service.get_note_id_by_phone_number_and_call_date("5551234567", 1),
        0
    );

    assert!(matches!(
        service.get_snippet_by_id(1),
        Err(ServiceError::Store(StoreError::Db(_)))
    ));
}
