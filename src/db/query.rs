//! Parameterized reads: single record, many records and pages.
//!
//! A [`Query`] runs on the pool, or on the transaction carried by its
//! [`Context`]. When a cache is attached the query is cache-aside: the cache
//! is consulted first and populated after a successful database fetch. The
//! layer does not synchronize concurrent writers, so a write that bypasses
//! this layer can leave a stale entry until its TTL expires.

use crate::cache::CacheAside;
use crate::db::context::Context;
use crate::db::mapper::Record;
use crate::error::{DataError, DataResult};
use crate::models::{Page, PageRequest, SqlParam};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// A read returning one record or many records of shape `T`.
pub struct Query<'a, T> {
    ctx: &'a Context,
    sql: String,
    params: Vec<SqlParam>,
    cache: Option<&'a dyn CacheAside<T>>,
}

impl<'a, T: Record> Query<'a, T> {
    pub fn new(ctx: &'a Context, sql: impl Into<String>) -> Self {
        Self {
            ctx,
            sql: sql.into(),
            params: Vec::new(),
            cache: None,
        }
    }

    /// Append the next positional parameter.
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Replace all positional parameters.
    pub fn with_params(mut self, params: Vec<SqlParam>) -> Self {
        self.params = params;
        self
    }

    /// Read through `cache` and populate it after a database fetch.
    pub fn with_cache(mut self, cache: &'a dyn CacheAside<T>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    fn validate(&self) -> DataResult<()> {
        validate_sql(&self.sql)?;
        self.ctx.ensure_ready()
    }

    /// Fetch a single record. No matching row is `Ok(None)`, not an error.
    ///
    /// Only the first row is decoded when the query returns several.
    pub async fn one(&self) -> DataResult<Option<T>> {
        self.validate()?;

        if let Some(cache) = self.cache {
            match cache.load_one().await {
                Ok(value) => return Ok(Some(value)),
                Err(e) => debug!(key = %cache.key(), reason = %e, "Cache miss, querying database"),
            }
        }

        let record = self
            .ctx
            .fetch_optional::<T>(&self.sql, &self.params)
            .await?;

        if let (Some(cache), Some(value)) = (self.cache, record.as_ref()) {
            if let Err(e) = cache.store_one(value).await {
                warn!(key = %cache.key(), error = %e, "Failed to populate cache");
            }
        }

        Ok(record)
    }

    /// Fetch every matching record, in result order.
    pub async fn many(&self) -> DataResult<Vec<T>> {
        self.validate()?;

        if let Some(cache) = self.cache {
            match cache.load_many().await {
                Ok(values) => return Ok(values),
                Err(e) => debug!(key = %cache.key(), reason = %e, "Cache miss, querying database"),
            }
        }

        let records = self.ctx.fetch_all::<T>(&self.sql, &self.params).await?;
        debug!(rows = records.len(), "Fetched records");

        if let Some(cache) = self.cache {
            if let Err(e) = cache.store_many(&records).await {
                warn!(key = %cache.key(), error = %e, "Failed to populate cache");
            }
        }

        Ok(records)
    }
}

impl<T> std::fmt::Debug for Query<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("cache", &self.cache.map(|c| c.key()))
            .finish()
    }
}

/// A read returning one page of records plus the total row count.
pub struct PageQuery<'a, T> {
    ctx: &'a Context,
    sql: String,
    params: Vec<SqlParam>,
    page: Option<PageRequest>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Record> PageQuery<'a, T> {
    /// `page` of `None` fails with "page is empty" on execution.
    pub fn new(ctx: &'a Context, sql: impl Into<String>, page: Option<PageRequest>) -> Self {
        Self {
            ctx,
            sql: sql.into(),
            params: Vec::new(),
            page,
            _marker: PhantomData,
        }
    }

    /// Append the next positional parameter. Both the count and the page
    /// query receive the same parameters.
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_params(mut self, params: Vec<SqlParam>) -> Self {
        self.params = params;
        self
    }

    /// SQL used to count every row of the query.
    pub fn count_sql(&self) -> String {
        count_sql(&self.sql)
    }

    /// SQL used to fetch the requested slice, if a page was given.
    pub fn page_sql(&self) -> Option<String> {
        self.page.as_ref().map(|page| page_sql(&self.sql, page))
    }

    fn validate(&self) -> DataResult<&PageRequest> {
        validate_sql(&self.sql)?;
        self.ctx.ensure_ready()?;
        let page = self.page.as_ref().ok_or(DataError::EmptyPage)?;
        page.validate().map_err(DataError::invalid_input)?;
        Ok(page)
    }

    /// Count the rows of the query and fetch the requested page.
    ///
    /// The two round trips are independent unless the context carries a
    /// transaction, so the total may drift from the slice under concurrent writes.
    pub async fn execute(&self) -> DataResult<Page<T>> {
        let page = self.validate()?;

        let total = self
            .ctx
            .fetch_optional::<i64>(&count_sql(&self.sql), &self.params)
            .await?
            .unwrap_or(0);

        let items = self
            .ctx
            .fetch_all::<T>(&page_sql(&self.sql, page), &self.params)
            .await?;

        debug!(
            page = page.page,
            size = page.size,
            total = total,
            rows = items.len(),
            "Fetched page"
        );

        Ok(Page {
            items,
            total,
            page: page.page,
            size: page.size,
        })
    }
}

impl<T> std::fmt::Debug for PageQuery<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageQuery")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("page", &self.page)
            .finish()
    }
}

/// A query with nothing left after trimming trailing semicolons is empty.
pub(crate) fn validate_sql(sql: &str) -> DataResult<()> {
    if subquery(sql).trim().is_empty() {
        return Err(DataError::EmptyQuery);
    }
    Ok(())
}

/// Strip trailing whitespace and semicolons so the query can be nested.
fn subquery(sql: &str) -> &str {
    sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn count_sql(sql: &str) -> String {
    format!("SELECT COUNT(tb.*) FROM ({}) tb", subquery(sql))
}

fn page_sql(sql: &str, page: &PageRequest) -> String {
    let mut out = subquery(sql).to_string();
    if !page.sort.is_empty() {
        let terms: Vec<String> = page.sort.iter().map(ToString::to_string).collect();
        out.push_str(" ORDER BY ");
        out.push_str(&terms.join(", "));
    }
    out.push_str(&format!(" LIMIT {} OFFSET {}", page.size, page.offset()));
    out
}
