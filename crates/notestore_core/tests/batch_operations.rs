use notestore_core::db::open_db_in_memory;
use notestore_core::{
    NewData, NewNote, NoteFolderService, NoteId, NoteRecord, SqliteRecordStore, ID_CALL_RECORD_FOLDER,
    ID_ROOT_FOLDER, ID_TRASH_FOLDER,
};
use rusqlite::Connection;

fn service(conn: &Connection) -> NoteFolderService<SqliteRecordStore<'_>> {
    NoteFolderService::new(SqliteRecordStore::new(conn))
}

fn note(service: &NoteFolderService<SqliteRecordStore<'_>>, id: NoteId) -> NoteRecord {
    service.find_note(id).unwrap().unwrap()
}

fn clear_local_modified(conn: &Connection) {
    conn.execute("UPDATE notes SET local_modified = 0;", [])
        .unwrap();
}

#[test]
fn batch_delete_with_no_ids_succeeds_without_changes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create_note(ID_ROOT_FOLDER, "kept").unwrap();

    assert!(service.batch_delete_notes(None::<NoteId>));
    assert!(service.batch_delete_notes(Vec::<NoteId>::new()));
    assert!(service.exist_in_note_database(id));
}

#[test]
fn batch_delete_removes_every_listed_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let first = service.create_note(ID_ROOT_FOLDER, "first").unwrap();
    let second = service.create_note(ID_ROOT_FOLDER, "second").unwrap();
    let other = service.create_note(ID_ROOT_FOLDER, "other").unwrap();

    assert!(service.batch_delete_notes([first, second, first]));

    assert!(!service.exist_in_note_database(first));
    assert!(!service.exist_in_note_database(second));
    assert!(service.exist_in_note_database(other));
}

#[test]
fn batch_delete_never_removes_root_folder() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create_note(ID_ROOT_FOLDER, "doomed").unwrap();

    // Root alone leaves nothing to apply.
    assert!(!service.batch_delete_notes([ID_ROOT_FOLDER]));
    assert!(service.exist_in_note_database(ID_ROOT_FOLDER));

    assert!(service.batch_delete_notes([ID_ROOT_FOLDER, id]));
    assert!(service.exist_in_note_database(ID_ROOT_FOLDER));
    assert!(!service.exist_in_note_database(id));
}

#[test]
fn batch_delete_missing_ids_still_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.batch_delete_notes([4242]));
}

#[test]
fn batch_delete_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let free = service.create_note(ID_ROOT_FOLDER, "free").unwrap();
    let locked = service.create_note(ID_ROOT_FOLDER, "locked").unwrap();
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_locked_delete BEFORE DELETE ON notes
         WHEN old.id = {locked}
         BEGIN SELECT RAISE(ABORT, 'locked note'); END;"
    ))
    .unwrap();

    assert!(!service.batch_delete_notes([free, locked]));

    assert!(service.exist_in_note_database(free));
    assert!(service.exist_in_note_database(locked));
    assert_eq!(note(&service, ID_ROOT_FOLDER).notes_count, 2);
}

#[test]
fn batch_delete_of_folder_removes_children_and_their_data() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let child = service.create_note(folder, "child").unwrap();
    let data = service
        .attach_data(&NewData::call(child, "", 1_700_000_000_000, "5551234567"))
        .unwrap();

    assert!(service.batch_delete_notes([folder]));

    assert!(!service.exist_in_note_database(folder));
    assert!(!service.exist_in_note_database(child));
    assert!(!service.exist_in_data_database(data));
}

#[test]
fn batch_delete_of_folder_removes_nested_subtree() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let outer = service.create_folder("Outer").unwrap();
    let inner = service
        .create_record(NewNote::folder(outer, "Inner"))
        .unwrap();
    let leaf = service.create_note(inner, "leaf").unwrap();
    let data = service
        .attach_data(&NewData::call(leaf, "", 1_700_000_000_000, "5551234567"))
        .unwrap();

    assert!(service.batch_delete_notes([outer]));

    assert!(!service.exist_in_note_database(inner));
    assert!(!service.exist_in_note_database(leaf));
    assert!(!service.exist_in_data_database(data));
    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM notes AS child
             WHERE child.type <> 2
               AND NOT EXISTS (SELECT 1 FROM notes AS parent WHERE parent.id = child.parent_id);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn batch_move_reparents_and_marks_local_modification() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let first = service.create_note(ID_ROOT_FOLDER, "first").unwrap();
    let second = service.create_note(ID_ROOT_FOLDER, "second").unwrap();
    clear_local_modified(&conn);

    assert!(service.batch_move_to_folder(vec![first, second], folder));

    for id in [first, second] {
        let moved = note(&service, id);
        assert_eq!(moved.parent_id, folder);
        assert!(moved.local_modified);
        assert_eq!(moved.version, 1);
    }
    assert_eq!(note(&service, folder).notes_count, 2);
    assert!(service.batch_move_to_folder(None::<NoteId>, folder));
}

#[test]
fn batch_move_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let free = service.create_note(ID_ROOT_FOLDER, "free").unwrap();
    let pinned = service.create_note(ID_ROOT_FOLDER, "pinned").unwrap();
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_pinned_move BEFORE UPDATE OF parent_id ON notes
         WHEN old.id = {pinned}
         BEGIN SELECT RAISE(ABORT, 'pinned note'); END;"
    ))
    .unwrap();

    assert!(!service.batch_move_to_folder([free, pinned], folder));

    assert_eq!(note(&service, free).parent_id, ID_ROOT_FOLDER);
    assert_eq!(note(&service, pinned).parent_id, ID_ROOT_FOLDER);
    assert_eq!(note(&service, folder).notes_count, 0);
}

#[test]
fn batch_move_to_trash_records_origin_once() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let id = service.create_note(folder, "draft").unwrap();

    assert!(service.batch_move_to_folder([id], ID_TRASH_FOLDER));
    let trashed = note(&service, id);
    assert_eq!(trashed.parent_id, ID_TRASH_FOLDER);
    assert_eq!(trashed.origin_parent_id, folder);
    assert!(trashed.is_in_trash());

    // A second trash move must not overwrite the origin with the trash id.
    assert!(service.batch_move_to_folder([id], ID_TRASH_FOLDER));
    assert_eq!(note(&service, id).origin_parent_id, folder);
}

#[test]
fn batch_move_does_not_protect_root_folder() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();

    assert!(service.batch_move_to_folder([ID_ROOT_FOLDER], folder));
    assert_eq!(note(&service, ID_ROOT_FOLDER).parent_id, folder);
}

#[test]
fn move_note_to_folder_records_source_as_origin() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create_note(ID_ROOT_FOLDER, "call").unwrap();
    clear_local_modified(&conn);

    service.move_note_to_folder(id, ID_ROOT_FOLDER, ID_CALL_RECORD_FOLDER);

    let moved = note(&service, id);
    assert_eq!(moved.parent_id, ID_CALL_RECORD_FOLDER);
    assert_eq!(moved.origin_parent_id, ID_ROOT_FOLDER);
    assert!(moved.local_modified);

    // Missing ids are logged and ignored.
    service.move_note_to_folder(4242, ID_ROOT_FOLDER, ID_CALL_RECORD_FOLDER);
    assert!(!service.exist_in_note_database(4242));
}

#[test]
fn restore_from_trash_returns_records_to_origin() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let id = service.create_note(folder, "draft").unwrap();
    assert!(service.batch_move_to_folder([id], ID_TRASH_FOLDER));

    assert!(service.restore_from_trash([id]));

    assert_eq!(note(&service, id).parent_id, folder);
    assert_eq!(note(&service, folder).notes_count, 1);
    assert_eq!(note(&service, ID_TRASH_FOLDER).notes_count, 0);
}

#[test]
fn restore_from_trash_falls_back_to_root_when_origin_is_trashed() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let id = service.create_note(folder, "draft").unwrap();
    assert!(service.batch_move_to_folder([id], ID_TRASH_FOLDER));
    assert!(service.batch_move_to_folder([folder], ID_TRASH_FOLDER));

    assert!(service.restore_from_trash([id]));
    assert_eq!(note(&service, id).parent_id, ID_ROOT_FOLDER);
}

#[test]
fn restore_from_trash_skips_records_outside_trash() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.create_note(ID_ROOT_FOLDER, "visible").unwrap();

    assert!(!service.restore_from_trash([id, 4242]));
    assert_eq!(note(&service, id).parent_id, ID_ROOT_FOLDER);
    assert!(service.restore_from_trash(None::<NoteId>));
}

#[test]
fn folder_note_counts_follow_inserts_moves_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let folder = service.create_folder("Work").unwrap();
    let first = service.create_note(folder, "first").unwrap();
    let second = service.create_note(folder, "second").unwrap();
    assert_eq!(note(&service, folder).notes_count, 2);

    assert!(service.batch_move_to_folder([first], ID_TRASH_FOLDER));
    assert_eq!(note(&service, folder).notes_count, 1);
    assert_eq!(note(&service, ID_TRASH_FOLDER).notes_count, 1);

    assert!(service.batch_delete_notes([second]));
    assert_eq!(note(&service, folder).notes_count, 0);

    // Folders are not counted as notes.
    assert_eq!(note(&service, ID_ROOT_FOLDER).notes_count, 0);
}
