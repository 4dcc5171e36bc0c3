//! Units of work executed inside one database transaction.
//!
//! [`Transaction::execute`] begins a transaction, hands the callback a
//! [`Context`] that carries it, and commits when the callback succeeds or
//! rolls back when it fails. Only operations issued with that derived context
//! take part in the transaction.

use crate::db::context::{Context, SharedTransaction};
use crate::error::{DataError, DataResult};
use sqlx::{PgPool, Postgres};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Whatever the server or session default is.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Statement applying this level, or `None` for the server default.
    pub fn set_sql(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::ReadUncommitted => Some("SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"),
            Self::ReadCommitted => Some("SET TRANSACTION ISOLATION LEVEL READ COMMITTED"),
            Self::RepeatableRead => Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ"),
            Self::Serializable => Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::ReadUncommitted => write!(f, "read uncommitted"),
            Self::ReadCommitted => write!(f, "read committed"),
            Self::RepeatableRead => write!(f, "repeatable read"),
            Self::Serializable => write!(f, "serializable"),
        }
    }
}

/// Runs units of work at one isolation level.
///
/// Holds no connection itself; every [`execute`](Self::execute) call begins
/// and ends its own transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transaction {
    isolation: IsolationLevel,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation(isolation: IsolationLevel) -> Self {
        Self { isolation }
    }

    /// Use the first of `levels`. Extra levels are ignored with a warning.
    pub fn from_levels(levels: &[IsolationLevel]) -> Self {
        if levels.len() > 1 {
            warn!(
                levels = levels.len(),
                using = %levels[0],
                "Multiple isolation levels given, only the first is used"
            );
        }
        Self {
            isolation: levels.first().copied().unwrap_or_default(),
        }
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Run `work` inside a transaction.
    ///
    /// `work` receives a context carrying the transaction; queries and
    /// statements must be issued with it to take part. An `Ok` result commits,
    /// an `Err` result rolls back and is returned unchanged. If the rollback
    /// itself fails the result is [`DataError::Rollback`], which keeps both
    /// the original error and the rollback failure.
    ///
    /// When `ctx` already carries a transaction, `work` joins it and the
    /// enclosing unit of work decides whether to commit.
    pub async fn execute<F, Fut, R>(&self, ctx: &Context, work: F) -> DataResult<R>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = DataResult<R>>,
    {
        if ctx.in_transaction() {
            debug!("Joining enclosing transaction");
            return work(ctx.clone()).await;
        }

        let pool = ctx.layer().pool()?;
        let tx = ctx.run("begin", self.begin(pool)).await?;
        debug!(isolation = %self.isolation, "Transaction started");

        let shared: SharedTransaction = Arc::new(Mutex::new(Some(tx)));
        let result = work(ctx.with_transaction(shared.clone())).await;

        // Detach the transaction so contexts leaked out of `work` stop using it.
        let tx = shared.lock().await.take().ok_or(DataError::TransactionClosed)?;

        match result {
            Ok(value) => {
                ctx.run("commit", async {
                    tx.commit().await.map_err(|source| DataError::Commit { source })
                })
                .await?;
                info!(isolation = %self.isolation, "Transaction committed");
                Ok(value)
            }
            Err(cause) => match tx.rollback().await {
                Ok(()) => {
                    warn!(error = %cause, "Transaction rolled back");
                    Err(cause)
                }
                Err(source) => {
                    warn!(error = %cause, rollback_error = %source, "Rollback failed");
                    Err(DataError::Rollback {
                        cause: Box::new(cause),
                        source,
                    })
                }
            },
        }
    }

    async fn begin(&self, pool: &PgPool) -> DataResult<sqlx::Transaction<'static, Postgres>> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|source| DataError::Begin { source })?;
        if let Some(sql) = self.isolation.set_sql() {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| DataError::Begin { source })?;
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DataLayer;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_isolation_sql() {
        assert_eq!(IsolationLevel::Default.set_sql(), None);
        assert_eq!(
            IsolationLevel::Serializable.set_sql(),
            Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        );
        assert_eq!(IsolationLevel::RepeatableRead.to_string(), "repeatable read");
    }

    #[test]
    fn test_from_levels_uses_first() {
        let tx = Transaction::from_levels(&[
            IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable,
        ]);
        assert_eq!(tx.isolation(), IsolationLevel::RepeatableRead);
        assert_eq!(
            Transaction::from_levels(&[]).isolation(),
            IsolationLevel::Default
        );
    }

    #[tokio::test]
    async fn test_not_initialized_skips_work() {
        let ctx = DataLayer::detached("tests").context();
        let ran = AtomicBool::new(false);
        let result = Transaction::new()
            .execute(&ctx, |_tx_ctx| async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(DataError::NotInitialized)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_begin_failure_is_wrapped() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let ctx = DataLayer::from_pool(pool, "tests").context();
        let result = Transaction::new()
            .execute(&ctx, |_tx_ctx| async { Ok(()) })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, DataError::Begin { .. }));
        assert!(err.to_string().starts_with("could not start transaction"));
    }
}
