//! SQLite dialect, plus an optional `rusqlite` runner for compiled queries.
//!
//! Array parameters are bound as JSON text and expanded with `json_each`,
//! which needs SQLite 3.38 or later (the bundled library qualifies).

use queryloom_db::query::SqlDialect;

/// The SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn case_sensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("{alias}{separator}{column} COLLATE BINARY")
    }

    fn case_insensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("{alias}{separator}{column} COLLATE NOCASE")
    }

    fn in_array_sql(&self) -> &'static str {
        "IN (SELECT value FROM json_each(?))"
    }

    // `LIMIT offset, count`.
    fn range_clause(&self) -> &'static str {
        "LIMIT ?, ?"
    }
}

#[cfg(feature = "sqlite")]
pub use runner::{bind_params, SqliteRow, SqliteRunner};

#[cfg(feature = "sqlite")]
mod runner {
    use std::path::{Path, PathBuf};

    use queryloom_core::{LoomError, LoomResult};
    use queryloom_db::query::{CompiledSql, PagedCompiledSql};
    use queryloom_db::Value;

    /// One result row with its column names.
    #[derive(Debug, Clone, PartialEq)]
    pub struct SqliteRow {
        columns: Vec<String>,
        values: Vec<Value>,
    }

    impl SqliteRow {
        /// Column names in result order.
        pub fn columns(&self) -> &[String] {
            &self.columns
        }

        /// Values in result order.
        pub fn values(&self) -> &[Value] {
            &self.values
        }

        /// The value of a column by its result label.
        pub fn get(&self, column: &str) -> Option<&Value> {
            self.columns
                .iter()
                .position(|c| c == column)
                .map(|i| &self.values[i])
        }
    }

    /// Runs compiled queries on a `rusqlite` connection.
    pub struct SqliteRunner {
        path: PathBuf,
        conn: rusqlite::Connection,
    }

    impl SqliteRunner {
        /// Opens a database file, or an in-memory database for `:memory:`.
        pub fn open(path: impl Into<PathBuf>) -> LoomResult<Self> {
            let path = path.into();
            let conn = if path.to_str() == Some(":memory:") {
                rusqlite::Connection::open_in_memory()
            } else {
                rusqlite::Connection::open(&path)
            }
            .map_err(|e| LoomError::DatabaseError(format!("SQLite open failed: {e}")))?;
            Ok(Self { path, conn })
        }

        /// Opens an in-memory database.
        pub fn memory() -> LoomResult<Self> {
            Self::open(":memory:")
        }

        /// The database path (or `:memory:`).
        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Runs a batch of statements without parameters, e.g. schema setup.
        pub fn execute_batch(&self, sql: &str) -> LoomResult<()> {
            self.conn
                .execute_batch(sql)
                .map_err(|e| LoomError::DatabaseError(format!("Batch failed: {e}")))
        }

        /// Runs SQL with positional parameters and returns every row.
        pub fn query(&self, sql: &str, params: &[Value]) -> LoomResult<Vec<SqliteRow>> {
            tracing::debug!(sql, params = params.len(), "sqlite query");
            let mut stmt = self
                .conn
                .prepare(sql)
                .map_err(|e| LoomError::DatabaseError(format!("Prepare failed: {e}")))?;
            bind_params(&mut stmt, params)?;

            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.raw_query();
            let mut out = Vec::new();
            while let Some(row) = rows
                .next()
                .map_err(|e| LoomError::DatabaseError(format!("Row fetch failed: {e}")))?
            {
                out.push(convert_row(row, &columns)?);
            }
            Ok(out)
        }

        /// Runs a compiled plain query.
        pub fn query_compiled(&self, compiled: &CompiledSql) -> LoomResult<Vec<SqliteRow>> {
            self.query(compiled.sql(), compiled.params())
        }

        /// Runs the page query of a paged result.
        pub fn query_page(&self, paged: &PagedCompiledSql) -> LoomResult<Vec<SqliteRow>> {
            self.query(paged.sql(), paged.params())
        }

        /// Runs the count query of a paged result.
        pub fn count(&self, paged: &PagedCompiledSql) -> LoomResult<i64> {
            let rows = self.query(paged.count_sql(), paged.count_params())?;
            rows.first()
                .and_then(|row| row.values().first())
                .and_then(Value::as_int)
                .ok_or_else(|| LoomError::DatabaseError("Count query returned no integer".to_string()))
        }
    }

    /// Binds values to a prepared statement, 1-based in order.
    ///
    /// Lists are bound as JSON array text so `json_each` can expand them;
    /// temporal values and UUIDs are bound as their text form.
    pub fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> LoomResult<()> {
        let expected = stmt.parameter_count();
        if expected != params.len() {
            return Err(LoomError::ParameterMismatch {
                context: "sqlite statement",
                placeholders: expected,
                params: params.len(),
            });
        }
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string()),
                Value::DateTimeTz(dt) => stmt.raw_bind_parameter(idx, dt.to_rfc3339()),
                Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string()),
                Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string()),
                Value::Json(_) | Value::List(_) => stmt.raw_bind_parameter(idx, param.to_json().to_string()),
            }
            .map_err(|e| LoomError::DatabaseError(format!("Bind error at parameter {idx}: {e}")))?;
        }
        Ok(())
    }

    fn convert_row(row: &rusqlite::Row<'_>, columns: &[String]) -> LoomResult<SqliteRow> {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value = match row
                .get_ref(i)
                .map_err(|e| LoomError::DatabaseError(format!("Column read failed: {e}")))?
            {
                rusqlite::types::ValueRef::Null => Value::Null,
                rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
                rusqlite::types::ValueRef::Real(v) => Value::Float(v),
                rusqlite::types::ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
            };
            values.push(value);
        }
        Ok(SqliteRow {
            columns: columns.to_vec(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queryloom_db::Value;

    #[test]
    fn test_fragments() {
        let d = SqliteDialect;
        assert_eq!(d.case_sensitive_column("c", ".", "name"), "c.name COLLATE BINARY");
        assert_eq!(d.case_insensitive_column("c", ".", "name"), "c.name COLLATE NOCASE");
        assert_eq!(d.in_array_sql().matches('?').count(), 1);
        assert_eq!(d.range_clause(), "LIMIT ?, ?");
        assert_eq!(d.range_transformation_params(0, 25), [Value::Int(0), Value::Int(25)]);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_runner_binds_lists_as_json() {
        let runner = SqliteRunner::memory().unwrap();
        runner
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT); INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c');")
            .unwrap();
        let rows = runner
            .query(
                "SELECT id FROM t WHERE id IN (SELECT value FROM json_each(?)) ORDER BY id",
                &[Value::list([1i64, 3])],
            )
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.get("id").cloned().unwrap()).collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(runner.path(), std::path::Path::new(":memory:"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_runner_rejects_wrong_param_count() {
        let runner = SqliteRunner::memory().unwrap();
        let err = runner.query("SELECT ?", &[]).unwrap_err();
        assert!(matches!(err, queryloom_core::LoomError::ParameterMismatch { .. }));
    }
}
