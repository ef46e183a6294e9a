//! CLI inspection probe.
//!
//! # Responsibility
//! - Verify `notestore_core` linkage and open a store file read-mostly.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `notestore_cli [<db-path> <command> [args...]]`
//!
//! Commands: `folders`, `snippet <id>`, `widgets <folder-id>`,
//! `call-note <number> <call-date-ms>`.
//!
//! Logging is enabled when `NOTESTORE_LOG_DIR` is set; the level comes from
//! `NOTESTORE_LOG_LEVEL` or the build-mode default.

use log::{error, info};
use notestore_core::db::open_db;
use notestore_core::{
    core_version, default_log_level, get_formatted_snippet, init_logging, ping,
    NoteFolderService, SqliteRecordStore,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("NOTESTORE_LOG_DIR") {
        let level = std::env::var("NOTESTORE_LOG_LEVEL")
            .unwrap_or_else(|_| default_log_level().to_string());
        if let Err(err) = init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("notestore_core ping={}", ping());
        println!("notestore_core version={}", core_version());
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(output) => {
            info!("event=cli_command module=cli status=ok command={}", args[1]);
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("event=cli_command module=cli status=error args={}", args.len());
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<String, String> {
    let (db_path, command) = match args {
        [db_path, command, ..] => (db_path, command.as_str()),
        _ => return Err(usage()),
    };
    let rest = &args[2..];

    let conn = open_db(db_path).map_err(|err| format!("cannot open `{db_path}`: {err}"))?;
    let service = NoteFolderService::new(SqliteRecordStore::new(&conn));

    match (command, rest) {
        ("folders", []) => Ok(format!("user_folders={}", service.get_user_folder_count())),
        ("snippet", [id]) => {
            let id = parse_i64(id, "id")?;
            let snippet = service
                .get_snippet_by_id(id)
                .map_err(|err| err.to_string())?;
            Ok(get_formatted_snippet(&snippet))
        }
        ("widgets", [folder_id]) => {
            let folder_id = parse_i64(folder_id, "folder-id")?;
            let widgets = service
                .get_folder_note_widget(folder_id)
                .ok_or_else(|| format!("widget lookup failed for folder {folder_id}"))?;
            let mut lines = widgets
                .iter()
                .map(|widget| format!("{} {:?}", widget.widget_id, widget.widget_type))
                .collect::<Vec<_>>();
            lines.sort();
            Ok(lines.join("\n"))
        }
        ("call-note", [number, call_date]) => {
            let call_date = parse_i64(call_date, "call-date-ms")?;
            let note_id = service.get_note_id_by_phone_number_and_call_date(number, call_date);
            Ok(format!("note_id={note_id}"))
        }
        _ => Err(usage()),
    }
}

fn parse_i64(value: &str, name: &str) -> Result<i64, String> {
    value
        .parse()
        .map_err(|_| format!("`{value}` is not a valid {name}"))
}

fn usage() -> String {
    "usage: notestore_cli <db-path> (folders | snippet <id> | widgets <folder-id> | call-note <number> <call-date-ms>)"
        .to_string()
}
