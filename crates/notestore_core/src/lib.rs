//! Data-access core for a note-taking application.
//! Notes and folders share one id space; this crate owns their invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod telephony;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::data::{DataContent, DataRecord, NewData, TextMode};
pub use model::ids::{
    is_system_folder_id, DataId, NoteId, NoteType, SystemFolder, WidgetType,
    ID_CALL_RECORD_FOLDER, ID_ROOT_FOLDER, ID_TEMPORARY_FOLDER, ID_TRASH_FOLDER,
};
pub use model::note::{NewNote, NoteRecord, NoteValidationError};
pub use model::widget::WidgetAttribute;
pub use repo::record_store::{
    Assignment, BatchOp, BatchResult, Condition, OpOutcome, Record, RecordQuery, RecordStore,
    SortOrder, SqliteRecordStore, StoreError, StoreResult, Table,
};
pub use service::folder_service::{
    get_formatted_snippet, NoteFolderService, ServiceError, ServiceResult,
};
pub use telephony::phone_numbers_equal;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
