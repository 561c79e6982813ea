//! Schema definition and forward migrations.
//!
//! One stable schema, versioned through `PRAGMA user_version`. Migrations
//! only ever append; a version bump must never destructively drop user data
//! (pending sales in particular survive every upgrade).

use sqlx::SqlitePool;

use crate::error::StoreError;

/// Ordered migrations; index + 1 is the resulting `user_version`.
const MIGRATIONS: &[&[&str]] = &[
    // v1: initial schema.
    &[
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id     TEXT PRIMARY KEY,
            name   TEXT NOT NULL,
            active INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            price       REAL NOT NULL,
            stock       INTEGER NOT NULL,
            category_id TEXT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pending_sales (
            id          TEXT PRIMARY KEY,
            vendor_id   TEXT NOT NULL,
            client      TEXT NOT NULL,
            lines       TEXT NOT NULL,
            total       REAL NOT NULL,
            vendor_name TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            error       TEXT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_pending_sales_vendor
            ON pending_sales (vendor_id, created_at)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS completed_sales (
            id          TEXT PRIMARY KEY,
            vendor_id   TEXT NOT NULL,
            client      TEXT NOT NULL,
            lines       TEXT NOT NULL,
            total       REAL NOT NULL,
            vendor_name TEXT NOT NULL,
            created_at  TEXT NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_completed_sales_vendor
            ON completed_sales (vendor_id)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS session (
            id            INTEGER PRIMARY KEY CHECK (id = 1),
            last_activity TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS carts (
            vendor_id  TEXT PRIMARY KEY,
            lines      TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ],
];

/// Bring the database up to the current schema version.
///
/// Failures here mean the store cannot be trusted, so they surface as
/// `StoreError::Unavailable` rather than a retryable I/O error.
pub(crate) async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(StoreError::unavailable)?;

    for (idx, statements) in MIGRATIONS.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }

        let mut tx = pool.begin().await.map_err(StoreError::unavailable)?;
        for statement in *statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::unavailable)?;
        }
        tx.commit().await.map_err(StoreError::unavailable)?;

        // PRAGMA does not accept bind parameters.
        sqlx::query(&format!("PRAGMA user_version = {version}"))
            .execute(pool)
            .await
            .map_err(StoreError::unavailable)?;

        tracing::debug!(version, "applied local store migration");
    }

    Ok(())
}
