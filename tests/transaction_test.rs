//! Integration tests for transactional units of work.

use data_layer::db::{DataLayer, IsolationLevel, Query, Statement, Transaction};
use data_layer::{Config, DataError};

/// Set TEST_DATABASE_URL to run these tests.
async fn setup() -> Option<(DataLayer, String)> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return None;
        }
    };

    let config = Config::new(url, "transaction_test").with_pool_size(1, 5);
    let layer = DataLayer::connect(&config).await.unwrap();
    let table = format!("dl_accounts_{}", rand::random::<u32>());

    Statement::new(
        &layer.context(),
        format!("CREATE TABLE {table} (id BIGINT PRIMARY KEY, balance BIGINT NOT NULL)"),
    )
    .execute()
    .await
    .unwrap();

    Some((layer, table))
}

async fn teardown(layer: &DataLayer, table: &str) {
    let _ = Statement::new(&layer.context(), format!("DROP TABLE IF EXISTS {table}"))
        .execute()
        .await;
    layer.close().await;
}

async fn count(ctx: &data_layer::Context, table: &str) -> i64 {
    Query::<i64>::new(ctx, format!("SELECT COUNT(*) FROM {table}"))
        .one()
        .await
        .unwrap()
        .unwrap_or(0)
}

#[tokio::test]
async fn test_error_rolls_back() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();
    let insert = format!("INSERT INTO {table} (id, balance) VALUES ($1, $2)");

    let result: Result<(), DataError> = Transaction::new()
        .execute(&ctx, |tx| async move {
            Statement::new(&tx, insert.as_str())
                .bind(1_i64)
                .bind(100_i64)
                .execute()
                .await?;
            Err(DataError::aborted("insufficient funds"))
        })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, DataError::Aborted { .. }));
    assert!(!err.is_rollback_failure());
    assert_eq!(count(&ctx, &table).await, 0);

    teardown(&layer, &table).await;
}

#[tokio::test]
async fn test_deferred_violation_fails_commit() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();
    let deferred = format!("{table}_deferred");
    Statement::new(
        &ctx,
        format!(
            "CREATE TABLE {deferred} (
                id BIGINT,
                CONSTRAINT {deferred}_id_key UNIQUE (id) DEFERRABLE INITIALLY DEFERRED
            )"
        ),
    )
    .execute()
    .await
    .unwrap();

    let insert = format!("INSERT INTO {deferred} (id) VALUES (1), (1)");
    let result = Transaction::new()
        .execute(&ctx, |tx| async move {
            Statement::new(&tx, insert.as_str()).execute().await
        })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, DataError::Commit { .. }));
    assert!(err.to_string().starts_with("could not commit transaction"));
    assert_eq!(err.sql_state().as_deref(), Some("23505"));
    assert_eq!(count(&ctx, &deferred).await, 0);

    let _ = Statement::new(&ctx, format!("DROP TABLE IF EXISTS {deferred}"))
        .execute()
        .await;
    teardown(&layer, &table).await;
}

#[tokio::test]
async fn test_success_commits() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();
    let insert = format!("INSERT INTO {table} (id, balance) VALUES ($1, $2)");

    let inserted = Transaction::with_isolation(IsolationLevel::ReadCommitted)
        .execute(&ctx, |tx| async move {
            let mut rows = 0;
            for id in 1..=3_i64 {
                rows += Statement::new(&tx, insert.as_str())
                    .bind(id)
                    .bind(id * 10)
                    .execute()
                    .await?;
            }
            Ok(rows)
        })
        .await
        .unwrap();

    assert_eq!(inserted, 3);
    assert_eq!(count(&ctx, &table).await, 3);

    teardown(&layer, &table).await;
}

#[tokio::test]
async fn test_only_derived_context_sees_uncommitted_writes() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();
    let outer = ctx.clone();
    let table_name = table.clone();

    let (inside, outside) = Transaction::new()
        .execute(&ctx, |tx| async move {
            Statement::new(
                &tx,
                format!("INSERT INTO {table_name} (id, balance) VALUES (1, 5)"),
            )
            .execute()
            .await?;
            let inside = count(&tx, &table_name).await;
            let outside = count(&outer, &table_name).await;
            Ok((inside, outside))
        })
        .await
        .unwrap();

    assert_eq!(inside, 1);
    assert_eq!(outside, 0);
    assert_eq!(count(&ctx, &table).await, 1);

    teardown(&layer, &table).await;
}

#[tokio::test]
async fn test_nested_execute_joins_enclosing_transaction() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();
    let insert = format!("INSERT INTO {table} (id, balance) VALUES ($1, 0)");

    let result: Result<(), DataError> = Transaction::new()
        .execute(&ctx, |tx| async move {
            Transaction::with_isolation(IsolationLevel::Serializable)
                .execute(&tx, |inner| async move {
                    assert!(inner.in_transaction());
                    Statement::new(&inner, insert.as_str())
                        .bind(1_i64)
                        .execute()
                        .await?;
                    Ok(())
                })
                .await?;
            Err(DataError::aborted("outer unit of work failed"))
        })
        .await;

    assert!(result.is_err());
    assert_eq!(count(&ctx, &table).await, 0);

    teardown(&layer, &table).await;
}

#[tokio::test]
async fn test_isolation_level_is_applied() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();

    let level = Transaction::from_levels(&[IsolationLevel::Serializable, IsolationLevel::ReadCommitted])
        .execute(&ctx, |tx| async move {
            Query::<String>::new(&tx, "SELECT current_setting('transaction_isolation')").one().await
        })
        .await
        .unwrap();
    assert_eq!(level.as_deref(), Some("serializable"));

    teardown(&layer, &table).await;
}

#[tokio::test]
async fn test_leaked_context_is_closed() {
    let Some((layer, table)) = setup().await else {
        return;
    };
    let ctx = layer.context();

    let leaked = Transaction::new()
        .execute(&ctx, |tx| async move { Ok(tx) })
        .await
        .unwrap();
    assert!(leaked.in_transaction());

    let result = Query::<i64>::new(&leaked, "SELECT 1").one().await;
    assert!(matches!(result, Err(DataError::TransactionClosed)));

    teardown(&layer, &table).await;
}
