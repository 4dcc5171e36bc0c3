//! Execution context threaded through every data operation.
//!
//! A [`Context`] decides where an operation runs: on the shared pool, or on
//! the transaction opened by an enclosing [`Transaction::execute`] call. It
//! also carries the caller's deadline. Contexts are cheap to clone.
//!
//! Only a context derived inside a unit of work carries its transaction. An
//! operation issued with the original context runs on the pool and does not
//! see uncommitted writes, even while the transaction is open.
//!
//! [`Transaction::execute`]: crate::db::Transaction::execute

use crate::db::mapper::{Record, scan_row};
use crate::db::params::prepare;
use crate::db::pool::DataLayer;
use crate::error::{DataError, DataResult};
use crate::models::SqlParam;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Transaction handle shared between a unit of work and the contexts derived for it.
pub(crate) type SharedTransaction = Arc<Mutex<Option<sqlx::Transaction<'static, Postgres>>>>;

/// Where a single round trip is sent.
enum Target<'a> {
    Pool(&'a PgPool),
    Transaction(&'a SharedTransaction),
}

#[derive(Clone)]
pub struct Context {
    layer: DataLayer,
    transaction: Option<SharedTransaction>,
    deadline: Option<Instant>,
}

impl Context {
    pub(crate) fn new(layer: DataLayer) -> Self {
        Self {
            layer,
            transaction: None,
            deadline: None,
        }
    }

    /// The data layer this context runs against.
    pub fn layer(&self) -> &DataLayer {
        &self.layer
    }

    /// Derive a context whose round trips fail once `timeout` has elapsed.
    ///
    /// An existing earlier deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context whose round trips fail after `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True when operations issued with this context join a transaction.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub(crate) fn with_transaction(&self, transaction: SharedTransaction) -> Self {
        Self {
            transaction: Some(transaction),
            ..self.clone()
        }
    }

    /// Fail fast when the pooled handle is absent.
    pub(crate) fn ensure_ready(&self) -> DataResult<()> {
        self.target().map(|_| ())
    }

    fn target(&self) -> DataResult<Target<'_>> {
        match &self.transaction {
            Some(shared) => Ok(Target::Transaction(shared)),
            None => self.layer.pool().map(Target::Pool),
        }
    }

    /// Await `fut`, bounded by this context's deadline.
    pub(crate) async fn run<F, O>(&self, operation: &str, fut: F) -> DataResult<O>
    where
        F: Future<Output = DataResult<O>>,
    {
        match self.deadline {
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return Err(DataError::timeout(operation));
                }
                tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| DataError::timeout(operation))?
            }
            None => fut.await,
        }
    }

    /// Fetch every row of `sql`, decoding each one into `T` as it arrives.
    pub(crate) async fn fetch_all<T: Record>(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> DataResult<Vec<T>> {
        let target = self.target()?;
        debug!(
            sql = %sql,
            params = params.len(),
            in_transaction = self.in_transaction(),
            "Fetching rows"
        );
        self.run("fetch", fetch_all_on::<T>(target, sql, params)).await
    }

    /// Fetch at most one row of `sql`. No rows is `Ok(None)`.
    pub(crate) async fn fetch_optional<T: Record>(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> DataResult<Option<T>> {
        let target = self.target()?;
        debug!(
            sql = %sql,
            params = params.len(),
            in_transaction = self.in_transaction(),
            "Fetching single row"
        );
        let row = self
            .run("fetch_optional", fetch_optional_on(target, sql, params))
            .await?;
        row.as_ref().map(scan_row::<T>).transpose()
    }

    /// Execute a write and return the number of affected rows.
    ///
    /// The statement is not kept in the connection's prepared statement cache.
    pub(crate) async fn execute(&self, sql: &str, params: &[SqlParam]) -> DataResult<u64> {
        let target = self.target()?;
        debug!(
            sql = %sql,
            params = params.len(),
            in_transaction = self.in_transaction(),
            "Executing statement"
        );
        self.run("execute", execute_on(target, sql, params)).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("layer", &self.layer)
            .field("in_transaction", &self.in_transaction())
            .field("deadline", &self.deadline)
            .finish()
    }
}

async fn fetch_all_on<T: Record>(
    target: Target<'_>,
    sql: &str,
    params: &[SqlParam],
) -> DataResult<Vec<T>> {
    match target {
        Target::Pool(pool) => collect_records(prepare(sql, params).fetch(pool)).await,
        Target::Transaction(shared) => {
            let mut guard = shared.lock().await;
            let tx = guard.as_mut().ok_or(DataError::TransactionClosed)?;
            collect_records(prepare(sql, params).fetch(&mut **tx)).await
        }
    }
}

async fn fetch_optional_on(
    target: Target<'_>,
    sql: &str,
    params: &[SqlParam],
) -> DataResult<Option<PgRow>> {
    let row = match target {
        Target::Pool(pool) => prepare(sql, params).fetch_optional(pool).await?,
        Target::Transaction(shared) => {
            let mut guard = shared.lock().await;
            let tx = guard.as_mut().ok_or(DataError::TransactionClosed)?;
            prepare(sql, params).fetch_optional(&mut **tx).await?
        }
    };
    Ok(row)
}

async fn execute_on(target: Target<'_>, sql: &str, params: &[SqlParam]) -> DataResult<u64> {
    let result = match target {
        Target::Pool(pool) => {
            prepare(sql, params)
                .persistent(false)
                .execute(pool)
                .await?
        }
        Target::Transaction(shared) => {
            let mut guard = shared.lock().await;
            let tx = guard.as_mut().ok_or(DataError::TransactionClosed)?;
            prepare(sql, params)
                .persistent(false)
                .execute(&mut **tx)
                .await?
        }
    };
    Ok(result.rows_affected())
}

async fn collect_records<T: Record>(
    mut rows: BoxStream<'_, Result<PgRow, sqlx::Error>>,
) -> DataResult<Vec<T>> {
    let mut records = Vec::new();
    while let Some(row) = rows.try_next().await? {
        records.push(scan_row::<T>(&row)?);
    }
    Ok(records)
}
