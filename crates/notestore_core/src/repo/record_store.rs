//! Transactional record store over the `notes` and `data` tables.
//!
//! # Responsibility
//! - Expose point get, filtered scan, count, single-row insert/update and
//!   an all-or-nothing batch primitive.
//! - Keep SQL text and column whitelisting inside the persistence boundary.
//!
//! # Invariants
//! - Only whitelisted column names ever reach SQL text; values are bound.
//! - `apply_batch` commits every operation or none of them.
//! - Statements and cursors are scoped to the call that opened them.
//! - Updates on `notes` stamp `modified_date` and bump `version`.

use crate::db::DbError;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;

const NOTES_COLUMNS: &[&str] = &[
    "id",
    "parent_id",
    "origin_parent_id",
    "alert_date",
    "bg_color_id",
    "created_date",
    "modified_date",
    "has_attachment",
    "notes_count",
    "snippet",
    "type",
    "widget_id",
    "widget_type",
    "sync_id",
    "local_modified",
    "gtask_id",
    "version",
];

const DATA_COLUMNS: &[&str] = &[
    "id",
    "mime_type",
    "note_id",
    "created_date",
    "modified_date",
    "content",
    "data1",
    "data2",
    "data3",
    "data4",
    "data5",
];

const NOW_MILLIS_SQL: &str = "(strftime('%s', 'now') * 1000)";

pub type StoreResult<T> = Result<T, StoreError>;

/// Logical table addressed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Notes,
    Data,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Data => "data",
        }
    }

    /// Whitelisted columns in declaration order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Notes => NOTES_COLUMNS,
            Self::Data => DATA_COLUMNS,
        }
    }

    fn column(self, name: &str) -> StoreResult<&'static str> {
        self.columns()
            .iter()
            .copied()
            .find(|column| *column == name)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: self,
                column: name.to_string(),
            })
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Record store error.
#[derive(Debug)]
pub enum StoreError {
    /// Engine or bootstrap failure outside a batch.
    Db(DbError),
    /// Point lookup found no row.
    NotFound { table: Table, id: i64 },
    /// Column name is not part of the table whitelist.
    UnknownColumn { table: Table, column: String },
    /// Operation shape is rejected before reaching the engine.
    InvalidOperation(String),
    /// Atomic batch was rolled back. `op_index` is `None` when begin or
    /// commit failed rather than one statement.
    TransactionFailure {
        op_index: Option<usize>,
        source: DbError,
    },
    /// Query succeeded but a field could not be read as requested.
    MalformedResult(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} row not found: {id}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::InvalidOperation(message) => write!(f, "invalid store operation: {message}"),
            Self::TransactionFailure {
                op_index: Some(index),
                source,
            } => write!(f, "batch rolled back at operation {index}: {source}"),
            Self::TransactionFailure {
                op_index: None,
                source,
            } => write!(f, "batch transaction failed: {source}"),
            Self::MalformedResult(message) => write!(f, "malformed result: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::TransactionFailure { source, .. } => Some(source),
            Self::NotFound { .. } => None,
            Self::UnknownColumn { .. } => None,
            Self::InvalidOperation(_) => None,
            Self::MalformedResult(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One row read from a table, limited to the projected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: Table,
    values: BTreeMap<&'static str, Value>,
}

impl Record {
    pub fn table(&self) -> Table {
        self.table
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn get_i64(&self, column: &str) -> StoreResult<i64> {
        match self.require(column)? {
            Value::Integer(value) => Ok(*value),
            other => Err(self.malformed(column, other)),
        }
    }

    pub fn get_opt_i64(&self, column: &str) -> StoreResult<Option<i64>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Integer(value) => Ok(Some(*value)),
            other => Err(self.malformed(column, other)),
        }
    }

    pub fn get_bool(&self, column: &str) -> StoreResult<bool> {
        match self.get_i64(column)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StoreError::MalformedResult(format!(
                "invalid flag value `{other}` in {}.{column}",
                self.table
            ))),
        }
    }

    pub fn get_text(&self, column: &str) -> StoreResult<String> {
        match self.require(column)? {
            Value::Text(value) => Ok(value.clone()),
            other => Err(self.malformed(column, other)),
        }
    }

    pub fn get_opt_text(&self, column: &str) -> StoreResult<Option<String>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value.clone())),
            other => Err(self.malformed(column, other)),
        }
    }

    fn require(&self, column: &str) -> StoreResult<&Value> {
        self.values.get(column).ok_or_else(|| {
            StoreError::MalformedResult(format!(
                "column `{column}` missing from {} result",
                self.table
            ))
        })
    }

    fn malformed(&self, column: &str, value: &Value) -> StoreError {
        StoreError::MalformedResult(format!(
            "unexpected {} in {}.{column}",
            value_kind(value),
            self.table
        ))
    }
}

/// AND-ed comparison used by queries and conditional updates.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
    Ne(&'static str, Value),
}

impl Condition {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(column, value.into())
    }

    pub fn ne(column: &'static str, value: impl Into<Value>) -> Self {
        Self::Ne(column, value.into())
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Eq(column, _) | Self::Ne(column, _) => column,
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            Self::Eq(..) => "=",
            Self::Ne(..) => "<>",
        }
    }

    fn value(&self) -> &Value {
        match self {
            Self::Eq(_, value) | Self::Ne(_, value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filtered scan over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    table: Table,
    columns: Vec<&'static str>,
    conditions: Vec<Condition>,
    order_by: Vec<(&'static str, SortOrder)>,
    limit: Option<u32>,
}

impl RecordQuery {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Projects the given columns. Without a projection all columns are read.
    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn filter_eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(Condition::eq(column, value))
    }

    pub fn filter_ne(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(Condition::ne(column, value))
    }

    pub fn order_by(mut self, column: &'static str, order: SortOrder) -> Self {
        self.order_by.push((column, order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> Table {
        self.table
    }

    fn projected_columns(&self) -> StoreResult<Vec<&'static str>> {
        if self.columns.is_empty() {
            return Ok(self.table.columns().to_vec());
        }
        self.columns
            .iter()
            .map(|column| self.table.column(column))
            .collect()
    }

    fn where_clause(&self, bind_values: &mut Vec<Value>) -> StoreResult<String> {
        where_clause(self.table, &self.conditions, bind_values)
    }
}

/// Value written by an update assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Copies another column of the same row, read before the update applies.
    CopyOf(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: &'static str,
    pub value: FieldValue,
}

impl Assignment {
    pub fn set(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: FieldValue::Value(value.into()),
        }
    }

    pub fn copy_from(column: &'static str, source: &'static str) -> Self {
        Self {
            column,
            value: FieldValue::CopyOf(source),
        }
    }
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Insert {
        table: Table,
        values: Vec<(&'static str, Value)>,
    },
    Update {
        table: Table,
        id: i64,
        assignments: Vec<Assignment>,
        /// Extra predicates on the target row; no match means zero rows affected.
        conditions: Vec<Condition>,
    },
    Delete {
        table: Table,
        id: i64,
    },
}

impl BatchOp {
    pub fn insert(table: Table, values: Vec<(&'static str, Value)>) -> Self {
        Self::Insert { table, values }
    }

    pub fn update(table: Table, id: i64, assignments: Vec<Assignment>) -> Self {
        Self::Update {
            table,
            id,
            assignments,
            conditions: Vec::new(),
        }
    }

    pub fn delete(table: Table, id: i64) -> Self {
        Self::Delete { table, id }
    }

    /// Narrows an update to rows that also match `condition`.
    ///
    /// No-op for inserts and deletes.
    pub fn when(mut self, condition: Condition) -> Self {
        if let Self::Update { conditions, .. } = &mut self {
            conditions.push(condition);
        }
        self
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Outcome of one committed batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpOutcome {
    pub affected_rows: usize,
    /// Row id assigned by an insert.
    pub inserted_id: Option<i64>,
}

/// Outcomes of a committed batch, in operation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    outcomes: Vec<OpOutcome>,
}

impl BatchResult {
    pub fn outcomes(&self) -> &[OpOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn total_affected(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.affected_rows).sum()
    }
}

/// Record store contract used by folder/note operations.
pub trait RecordStore {
    /// Loads one full row by id.
    fn get(&self, table: Table, id: i64) -> StoreResult<Record>;
    /// Streams matching rows to `visit` until it breaks or rows run out.
    fn query_each(
        &self,
        query: &RecordQuery,
        visit: &mut dyn FnMut(Record) -> ControlFlow<()>,
    ) -> StoreResult<()>;
    /// Counts rows matching the query conditions.
    fn count(&self, query: &RecordQuery) -> StoreResult<i64>;
    /// Inserts one row and returns its id.
    fn insert(&self, table: Table, values: &[(&'static str, Value)]) -> StoreResult<i64>;
    /// Updates one row by id and returns affected row count.
    fn update(&self, table: Table, id: i64, assignments: &[Assignment]) -> StoreResult<usize>;
    /// Applies all operations in one transaction.
    fn apply_batch(&self, ops: &[BatchOp]) -> StoreResult<BatchResult>;

    /// Collects every matching row.
    fn query(&self, query: &RecordQuery) -> StoreResult<Vec<Record>> {
        let mut records = Vec::new();
        self.query_each(query, &mut |record| {
            records.push(record);
            ControlFlow::Continue(())
        })?;
        Ok(records)
    }
}

/// SQLite-backed record store.
#[derive(Clone, Copy)]
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Wraps a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn get(&self, table: Table, id: i64) -> StoreResult<Record> {
        let query = RecordQuery::new(table).filter_eq("id", id).limit(1);
        let mut found = None;
        self.query_each(&query, &mut |record| {
            found = Some(record);
            ControlFlow::Break(())
        })?;
        found.ok_or(StoreError::NotFound { table, id })
    }

    fn query_each(
        &self,
        query: &RecordQuery,
        visit: &mut dyn FnMut(Record) -> ControlFlow<()>,
    ) -> StoreResult<()> {
        let columns = query.projected_columns()?;
        let mut bind_values = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            columns.join(", "),
            query.table.name(),
            query.where_clause(&mut bind_values)?
        );

        if !query.order_by.is_empty() {
            let order = query
                .order_by
                .iter()
                .map(|(column, order)| -> StoreResult<String> {
                    let column = query.table.column(column)?;
                    Ok(match order {
                        SortOrder::Asc => format!("{column} ASC"),
                        SortOrder::Desc => format!("{column} DESC"),
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        while let Some(row) = rows.next()? {
            let record = read_record(query.table, &columns, row)?;
            if visit(record).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn count(&self, query: &RecordQuery) -> StoreResult<i64> {
        let mut bind_values = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            query.table.name(),
            query.where_clause(&mut bind_values)?
        );
        let count = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count)
    }

    fn insert(&self, table: Table, values: &[(&'static str, Value)]) -> StoreResult<i64> {
        execute_insert(self.conn, table, values)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, table: Table, id: i64, assignments: &[Assignment]) -> StoreResult<usize> {
        execute_update(self.conn, table, id, assignments, &[])
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> StoreResult<BatchResult> {
        for op in ops {
            validate_op(op)?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate).map_err(
            |err| StoreError::TransactionFailure {
                op_index: None,
                source: err.into(),
            },
        )?;

        let mut outcomes = Vec::with_capacity(ops.len());
        for (index, op) in ops.iter().enumerate() {
            // Dropping `tx` on the error path rolls back every earlier statement.
            let outcome = execute_op(&tx, op).map_err(|err| {
                warn!(
                    "event=batch_apply module=store status=error op_index={} op={} error={}",
                    index,
                    op.kind(),
                    err
                );
                into_transaction_failure(Some(index), err)
            })?;
            outcomes.push(outcome);
        }

        tx.commit().map_err(|err| StoreError::TransactionFailure {
            op_index: None,
            source: err.into(),
        })?;

        debug!(
            "event=batch_apply module=store status=ok ops={}",
            outcomes.len()
        );
        Ok(BatchResult { outcomes })
    }
}

fn validate_op(op: &BatchOp) -> StoreResult<()> {
    match op {
        BatchOp::Insert { table, values } => {
            for (column, _) in values {
                table.column(column)?;
            }
        }
        BatchOp::Update {
            table,
            assignments,
            conditions,
            ..
        } => {
            if assignments.is_empty() {
                return Err(StoreError::InvalidOperation(
                    "update requires at least one assignment".to_string(),
                ));
            }
            for assignment in assignments {
                table.column(assignment.column)?;
                if let FieldValue::CopyOf(source) = assignment.value {
                    table.column(source)?;
                }
            }
            for condition in conditions {
                table.column(condition.column())?;
            }
        }
        BatchOp::Delete { .. } => {}
    }
    Ok(())
}

fn execute_op(conn: &Connection, op: &BatchOp) -> StoreResult<OpOutcome> {
    match op {
        BatchOp::Insert { table, values } => {
            let affected_rows = execute_insert(conn, *table, values)?;
            Ok(OpOutcome {
                affected_rows,
                inserted_id: Some(conn.last_insert_rowid()),
            })
        }
        BatchOp::Update {
            table,
            id,
            assignments,
            conditions,
        } => Ok(OpOutcome {
            affected_rows: execute_update(conn, *table, *id, assignments, conditions)?,
            inserted_id: None,
        }),
        BatchOp::Delete { table, id } => Ok(OpOutcome {
            affected_rows: execute_delete(conn, *table, *id)?,
            inserted_id: None,
        }),
    }
}

fn execute_insert(
    conn: &Connection,
    table: Table,
    values: &[(&'static str, Value)],
) -> StoreResult<usize> {
    if values.is_empty() {
        let sql = format!("INSERT INTO {} DEFAULT VALUES;", table.name());
        return Ok(conn.execute(&sql, [])?);
    }

    let mut columns = Vec::with_capacity(values.len());
    let mut bind_values = Vec::with_capacity(values.len());
    for (column, value) in values {
        columns.push(table.column(column)?);
        bind_values.push(value.clone());
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        table.name(),
        columns.join(", ")
    );
    Ok(conn.execute(&sql, params_from_iter(bind_values))?)
}

fn execute_update(
    conn: &Connection,
    table: Table,
    id: i64,
    assignments: &[Assignment],
    conditions: &[Condition],
) -> StoreResult<usize> {
    if assignments.is_empty() {
        return Err(StoreError::InvalidOperation(
            "update requires at least one assignment".to_string(),
        ));
    }

    let mut set_clauses = Vec::with_capacity(assignments.len() + 2);
    let mut bind_values = Vec::new();
    for assignment in assignments {
        let column = table.column(assignment.column)?;
        match &assignment.value {
            FieldValue::Value(value) => {
                set_clauses.push(format!("{column} = ?"));
                bind_values.push(value.clone());
            }
            FieldValue::CopyOf(source) => {
                let source = table.column(source)?;
                set_clauses.push(format!("{column} = {source}"));
            }
        }
    }

    let stamps_modified = assignments
        .iter()
        .any(|assignment| assignment.column == "modified_date");
    if !stamps_modified {
        set_clauses.push(format!("modified_date = {NOW_MILLIS_SQL}"));
    }
    if table == Table::Notes && !assignments.iter().any(|a| a.column == "version") {
        set_clauses.push("version = version + 1".to_string());
    }

    let mut all_conditions = Vec::with_capacity(conditions.len() + 1);
    all_conditions.push(Condition::eq("id", id));
    all_conditions.extend(conditions.iter().cloned());
    let sql = format!(
        "UPDATE {} SET {}{};",
        table.name(),
        set_clauses.join(", "),
        where_clause(table, &all_conditions, &mut bind_values)?
    );
    Ok(conn.execute(&sql, params_from_iter(bind_values))?)
}

fn execute_delete(conn: &Connection, table: Table, id: i64) -> StoreResult<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1;", table.name());
    Ok(conn.execute(&sql, [id])?)
}

fn where_clause(
    table: Table,
    conditions: &[Condition],
    bind_values: &mut Vec<Value>,
) -> StoreResult<String> {
    if conditions.is_empty() {
        return Ok(String::new());
    }

    let mut parts = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let column = table.column(condition.column())?;
        parts.push(format!("{column} {} ?", condition.operator()));
        bind_values.push(condition.value().clone());
    }
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn read_record(table: Table, columns: &[&'static str], row: &Row<'_>) -> StoreResult<Record> {
    let mut values = BTreeMap::new();
    for (index, column) in columns.iter().enumerate() {
        values.insert(*column, row.get::<_, Value>(index)?);
    }
    Ok(Record { table, values })
}

fn into_transaction_failure(op_index: Option<usize>, err: StoreError) -> StoreError {
    match err {
        StoreError::Db(source) => StoreError::TransactionFailure { op_index, source },
        other => other,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}
