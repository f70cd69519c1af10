//! Structured Query Executor.
//!
//! Generated text runs on the read-only pool inside a transaction that is
//! always rolled back, under an explicit deadline. The deadline is enforced
//! inside SQLite through a progress handler, so a runaway statement is
//! interrupted and its connection returns to the pool idle. Every failure,
//! including the deadline, comes back as a [`QueryError`].

use std::time::{Duration, Instant};

use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Connection, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use crate::core::errors::QueryError;

/// One result row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryRow {
    pub columns: Vec<(String, Value)>,
}

impl QueryRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Display text for `column`; empty for missing or NULL.
    pub fn text(&self, column: &str) -> String {
        match self.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 1_000;

/// Extra wait past the deadline before the caller stops waiting on SQLite.
const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct QueryExecutor {
    pool: SqlitePool,
    timeout: Duration,
    statement_guard: bool,
}

impl QueryExecutor {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self {
            pool,
            timeout,
            statement_guard: false,
        }
    }

    /// Accept only a single `SELECT`/`WITH` statement.
    pub fn with_statement_guard(mut self, enabled: bool) -> Self {
        self.statement_guard = enabled;
        self
    }

    pub async fn execute(&self, sql: &str) -> Result<Vec<QueryRow>, QueryError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        if self.statement_guard {
            check_statement(sql)?;
        }

        match tokio::time::timeout(self.timeout + INTERRUPT_GRACE, self.run(sql)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }

    async fn run(&self, sql: &str) -> Result<Vec<QueryRow>, QueryError> {
        let deadline = Instant::now() + self.timeout;
        let mut conn = self.pool.acquire().await.map_err(execution_error)?;

        // Replaces whatever handler a previous run left on this connection.
        conn.lock_handle()
            .await
            .map_err(execution_error)?
            .set_progress_handler(PROGRESS_OPS, move || Instant::now() < deadline);

        let fetched = fetch_rolled_back(&mut conn, sql).await;
        release(conn).await;

        match fetched {
            Ok(rows) => Ok(rows.iter().map(decode_row).collect()),
            Err(_) if Instant::now() >= deadline => Err(QueryError::Timeout(self.timeout)),
            Err(err) => Err(execution_error(err)),
        }
    }
}

async fn fetch_rolled_back(
    conn: &mut PoolConnection<Sqlite>,
    sql: &str,
) -> Result<Vec<SqliteRow>, sqlx::Error> {
    let mut tx = conn.begin().await?;
    let fetched = sqlx::query(sql).fetch_all(&mut *tx).await;
    if let Err(err) = tx.rollback().await {
        tracing::warn!("Rollback of structured query failed: {}", err);
    }
    fetched
}

/// Drops the deadline from a healthy connection. A connection whose handle
/// cannot be locked is closed instead of going back to the pool.
async fn release(mut conn: PoolConnection<Sqlite>) {
    let failed = match conn.lock_handle().await {
        Ok(mut handle) => {
            handle.remove_progress_handler();
            None
        }
        Err(err) => Some(err),
    };
    if let Some(err) = failed {
        tracing::warn!("Discarding reader connection: {}", err);
        if let Err(err) = conn.detach().close().await {
            tracing::warn!("Closing reader connection failed: {}", err);
        }
    }
}

fn execution_error(err: sqlx::Error) -> QueryError {
    QueryError::Execution(err.to_string())
}

fn check_statement(sql: &str) -> Result<(), QueryError> {
    let body = sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if body.contains(';') {
        return Err(QueryError::Rejected("multiple statements".to_string()));
    }
    let keyword = body
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match keyword.as_str() {
        "select" | "with" => Ok(()),
        other => Err(QueryError::Rejected(format!("{} statements are not allowed", other))),
    }
}

fn decode_row(row: &SqliteRow) -> QueryRow {
    let columns = row
        .columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            (column.name().to_string(), decode_value(row, index))
        })
        .collect();
    QueryRow { columns }
}

fn decode_value(row: &SqliteRow, index: usize) -> Value {
    let kind = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match kind.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
