//! Session lifecycle and statement dispatch.
//!
//! A [`Session`] owns exactly one connection to the embedded engine and runs
//! everything synchronously on the caller's thread. With `auto_commit` (the
//! default) the engine's autocommit mode applies each statement on its own;
//! with it disabled the session keeps a deferred transaction open and the
//! caller decides when to [`Session::commit`] or [`Session::rollback`].
//! Engine rejections are caught per statement: the open transaction (if any)
//! is rolled back and the error is returned with the statement text attached,
//! leaving the session usable.

use log::{debug, info, warn};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::input::Condition;
use crate::normalize::{normalize, NormalizedResult};
use crate::statement::{
    add_column_sql, count_rows_sql, delete_sql, drop_table_sql, rename_column_sql,
    rename_table_sql, CreateTable, Insert, Prepared, Select, SqlQuery, Update,
};
use crate::value::Value;

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Collapse unnecessary result nesting (see [`crate::normalize`]).
    pub prettify: bool,
    /// Let the engine commit each statement on its own.
    pub auto_commit: bool,
}

impl SessionConfig {
    /// Config for a file-backed database with default options.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prettify: true,
            auto_commit: true,
        }
    }

    /// Config for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn with_prettify(mut self, prettify: bool) -> Self {
        self.prettify = prettify;
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }
}

/// One `PRAGMA table_info` row: a column's position, name and declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub position: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default: Option<Value>,
    pub primary_key: bool,
}

/// A live connection to an embedded SQLite database.
pub struct Session {
    conn: Connection,
    prettify: bool,
    auto_commit: bool,
    in_txn: bool,
}

impl Session {
    /// Open a session for the given config.
    pub fn open(config: SessionConfig) -> Result<Session> {
        let conn = Connection::open(&config.path)?;
        info!("opened sqlite session at {}", config.path);
        let mut session = Session {
            conn,
            prettify: config.prettify,
            auto_commit: config.auto_commit,
            in_txn: false,
        };
        if !config.auto_commit {
            session.begin()?;
        }
        Ok(session)
    }

    /// Open an in-memory session with default options.
    pub fn open_in_memory() -> Result<Session> {
        Self::open(SessionConfig::in_memory())
    }

    // ---- transaction control -------------------------------------------

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        self.in_txn = true;
        Ok(())
    }

    /// Commit pending work. A no-op under `auto_commit`.
    pub fn commit(&mut self) -> Result<()> {
        if self.in_txn {
            self.conn.execute_batch("COMMIT")?;
            self.in_txn = false;
            self.begin()?;
        }
        Ok(())
    }

    /// Discard pending work. A no-op under `auto_commit`.
    pub fn rollback(&mut self) -> Result<()> {
        if self.in_txn {
            self.conn.execute_batch("ROLLBACK")?;
            self.in_txn = false;
            self.begin()?;
        }
        Ok(())
    }

    /// Commit pending work and end the session.
    pub fn close(mut self) -> Result<()> {
        if self.in_txn {
            self.conn.execute_batch("COMMIT")?;
            self.in_txn = false;
        }
        Ok(())
    }

    // Convert an engine rejection into a local error, rolling back the open
    // transaction so the session stays usable.
    fn fail(&mut self, source: rusqlite::Error, sql: &str) -> Error {
        warn!("statement rejected, rolling back: {source}");
        if self.in_txn {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("rollback failed: {e}");
            }
            self.in_txn = false;
            if let Err(e) = self.begin() {
                warn!("could not reopen transaction: {e}");
            }
        }
        Error::engine(source, sql)
    }

    // ---- dispatch primitives -------------------------------------------

    fn fetch_rows(&mut self, query: &SqlQuery) -> Result<Vec<Vec<Value>>> {
        debug!("statement:\n{}", query.sql);
        let fetched = fetch_all(&self.conn, query);
        fetched.map_err(|e| self.fail(e, &query.sql))
    }

    fn run(&mut self, query: &SqlQuery) -> Result<usize> {
        debug!("statement:\n{}", query.sql);
        self.conn
            .execute(&query.sql, params_from_iter(query.params.iter()))
            .map_err(|e| self.fail(e, &query.sql))
    }

    fn run_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> Result<usize> {
        debug!("statement ({} rows):\n{}", rows.len(), sql);
        let executed = execute_per_row(&self.conn, sql, rows);
        executed.map_err(|e| self.fail(e, sql))
    }

    // ---- statement operations ------------------------------------------

    /// Create a table from a [`CreateTable`] builder.
    pub fn create_table(&mut self, table: &CreateTable) -> Result<()> {
        let query = table.build()?;
        self.run(&query)?;
        Ok(())
    }

    /// Run a [`Select`] and normalize its rows.
    pub fn select(&mut self, select: &Select) -> Result<NormalizedResult> {
        let query = select.build();
        let rows = self.fetch_rows(&query)?;
        Ok(normalize(rows, self.prettify))
    }

    /// Run an [`Insert`], resolving a `*` column list against the table's
    /// metadata first. Returns the number of inserted rows.
    pub fn insert(&mut self, insert: Insert) -> Result<usize> {
        let insert = if insert.columns_are_all() {
            let names = self
                .table_info(insert.table())?
                .into_iter()
                .map(|column| column.name)
                .collect();
            insert.resolve_columns(names)
        } else {
            insert
        };
        match insert.build()? {
            Prepared::Single(query) => self.run(&query),
            Prepared::Batch { sql, rows } => self.run_batch(&sql, &rows),
        }
    }

    /// Run an [`Update`]. Returns the number of affected rows.
    pub fn update(&mut self, update: Update) -> Result<usize> {
        let query = update.build()?;
        self.run(&query)
    }

    /// Delete the rows matching `filter`. Returns the number of deleted rows.
    pub fn delete(&mut self, table: &str, filter: impl Into<Condition>) -> Result<usize> {
        self.run(&delete_sql(table, &filter.into()))
    }

    /// Drop one table.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        self.run(&drop_table_sql(table))?;
        Ok(())
    }

    /// Drop several tables in order, stopping at the first failure.
    ///
    /// Tables dropped before the failure stay dropped; the batch has no
    /// shared transaction envelope.
    pub fn drop_tables(&mut self, tables: &[&str]) -> Result<()> {
        for table in tables {
            self.drop_table(table)?;
        }
        Ok(())
    }

    /// Drop tables with `PRAGMA foreign_keys` turned off for the duration.
    ///
    /// The pragma has no effect inside a transaction, so any pending work is
    /// committed before it is toggled.
    pub fn drop_tables_without_fk_checks(&mut self, tables: &[&str]) -> Result<()> {
        if self.in_txn {
            self.conn.execute_batch("COMMIT")?;
            self.in_txn = false;
        }
        self.conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        let dropped = self.drop_tables(tables);
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if !self.auto_commit && !self.in_txn {
            self.begin()?;
        }
        dropped
    }

    /// Rename one table.
    pub fn rename_table(&mut self, table: &str, new_name: &str) -> Result<()> {
        self.run(&rename_table_sql(table, new_name))?;
        Ok(())
    }

    /// Rename several tables in order, stopping at the first failure.
    pub fn rename_tables(&mut self, renames: &[(&str, &str)]) -> Result<()> {
        for (table, new_name) in renames {
            self.rename_table(table, new_name)?;
        }
        Ok(())
    }

    /// Add one column; `definition` is a full column definition such as
    /// `"age INTEGER DEFAULT 0"`.
    pub fn add_column(&mut self, table: &str, definition: &str) -> Result<()> {
        self.run(&add_column_sql(table, definition))?;
        Ok(())
    }

    /// Add several columns in order, stopping at the first failure.
    pub fn add_columns(&mut self, table: &str, definitions: &[&str]) -> Result<()> {
        for definition in definitions {
            self.add_column(table, definition)?;
        }
        Ok(())
    }

    /// Rename one column.
    pub fn rename_column(&mut self, table: &str, column: &str, new_name: &str) -> Result<()> {
        self.run(&rename_column_sql(table, column, new_name))?;
        Ok(())
    }

    /// Rename several columns in order, stopping at the first failure.
    pub fn rename_columns(&mut self, table: &str, renames: &[(&str, &str)]) -> Result<()> {
        for (column, new_name) in renames {
            self.rename_column(table, column, new_name)?;
        }
        Ok(())
    }

    // ---- raw dispatch ---------------------------------------------------

    /// Run an arbitrary statement and normalize whatever rows it returns.
    pub fn execute_sql(&mut self, query: &SqlQuery) -> Result<NormalizedResult> {
        let rows = self.fetch_rows(query)?;
        Ok(normalize(rows, self.prettify))
    }

    /// Prepare `sql` once and execute it for every row of parameters.
    /// Returns the total number of affected rows.
    pub fn execute_many(&mut self, sql: &str, rows: &[Vec<Value>]) -> Result<usize> {
        self.run_batch(sql, rows)
    }

    // ---- introspection --------------------------------------------------

    /// Names of all tables in the database.
    pub fn tables(&mut self) -> Result<Vec<String>> {
        let query = SqlQuery::new("SELECT name FROM sqlite_master WHERE type = 'table';");
        let rows = self.fetch_rows(&query)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|value| value.as_text().map(str::to_string))
            .collect())
    }

    /// The stored `CREATE TABLE` text for a table.
    pub fn schema(&mut self, table: &str) -> Result<String> {
        let query = SqlQuery::new(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?;",
        )
        .with_params(vec![Value::from(table)]);
        let rows = self.fetch_rows(&query)?;
        rows.into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_text().map(str::to_string))
            .ok_or_else(|| Error::TableNotFound {
                table: table.to_string(),
            })
    }

    /// Column metadata for a table, in schema order.
    pub fn table_info(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        // PRAGMA arguments cannot be bound, the name goes in as trusted text.
        let query = SqlQuery::new(format!("PRAGMA table_info({table});"));
        let rows = self.fetch_rows(&query)?;
        if rows.is_empty() {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let mut fields = row.into_iter();
            let position = fields.next().and_then(|v| v.as_integer()).unwrap_or(0);
            let name = fields
                .next()
                .and_then(|v| v.as_text().map(str::to_string))
                .unwrap_or_default();
            let declared_type = fields
                .next()
                .and_then(|v| v.as_text().map(str::to_string))
                .unwrap_or_default();
            let not_null = fields.next().and_then(|v| v.as_integer()).unwrap_or(0) != 0;
            let default = match fields.next() {
                Some(Value::Null) | None => None,
                Some(value) => Some(value),
            };
            let primary_key = fields.next().and_then(|v| v.as_integer()).unwrap_or(0) != 0;
            columns.push(ColumnInfo {
                position,
                name,
                declared_type,
                not_null,
                default,
                primary_key,
            });
        }
        Ok(columns)
    }

    /// Count the rows matching an optional filter.
    pub fn count_rows(&mut self, table: &str, filter: Option<&Condition>) -> Result<i64> {
        let query = count_rows_sql(table, filter);
        let rows = self.fetch_rows(&query)?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_integer)
            .unwrap_or(0))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_txn {
            if self.conn.execute_batch("COMMIT").is_err() {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
            self.in_txn = false;
        }
    }
}

// Free helpers keep the borrow of `conn` separate from `&mut self`, so
// failures can still roll back through the session.

fn fetch_all(conn: &Connection, query: &SqlQuery) -> rusqlite::Result<Vec<Vec<Value>>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let width = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(Value::from(row.get_ref(i)?));
        }
        out.push(values);
    }
    Ok(out)
}

fn execute_per_row(conn: &Connection, sql: &str, rows: &[Vec<Value>]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(sql)?;
    let mut affected = 0;
    for row in rows {
        affected += stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(affected)
}
