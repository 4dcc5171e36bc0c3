//! Single parameterized writes.

use crate::db::context::Context;
use crate::db::query::validate_sql;
use crate::error::DataResult;
use crate::models::SqlParam;
use tracing::debug;

/// One `INSERT`, `UPDATE`, `DELETE` or DDL statement.
///
/// Runs on the transaction carried by the context when there is one,
/// otherwise on the pool. The statement is not kept in the connection's
/// prepared statement cache, so nothing is left allocated on the server
/// after it completes or fails.
pub struct Statement<'a> {
    ctx: &'a Context,
    sql: String,
    params: Vec<SqlParam>,
}

impl<'a> Statement<'a> {
    pub fn new(ctx: &'a Context, sql: impl Into<String>) -> Self {
        Self {
            ctx,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter.
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_params(mut self, params: Vec<SqlParam>) -> Self {
        self.params = params;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Execute the statement and return the number of affected rows.
    pub async fn execute(&self) -> DataResult<u64> {
        validate_sql(&self.sql)?;
        self.ctx.ensure_ready()?;

        let rows_affected = self.ctx.execute(&self.sql, &self.params).await?;
        debug!(rows_affected = rows_affected, "Statement executed");
        Ok(rows_affected)
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("in_transaction", &self.ctx.in_transaction())
            .finish()
    }
}
