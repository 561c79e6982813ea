//! SQLite-backed local store.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use mostrador_catalog::{Category, Product};
use mostrador_core::{CategoryId, ProductId, SaleId, VendorId};
use mostrador_sales::{CartLine, Sale, SaleLine, SaleStatus};

use crate::error::StoreError;
use crate::schema;

/// Durable local replica and sale queue.
///
/// Cheap to clone; safe to share across tasks. All operations are
/// asynchronous and atomic (single statement or single transaction).
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (creating if missing) the store at `path` and migrate it.
    ///
    /// An open or migration failure is `StoreError::Unavailable`: without
    /// the store there is no offline capability at all.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(StoreError::unavailable)?;

        schema::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store for tests. A single connection keeps every query on
    /// the same SQLite memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::unavailable)?;

        schema::migrate(&pool).await?;
        Ok(Self { pool })
    }

    // ----- categories -------------------------------------------------

    /// Replace the whole category replica. Categories have no independent
    /// local lifecycle, so full-replace is the only write path.
    pub async fn save_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        for category in categories {
            sqlx::query("INSERT INTO categories (id, name, active) VALUES (?1, ?2, ?3)")
                .bind(category.id.as_str())
                .bind(&category.name)
                .bind(category.active)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn load_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name, active FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: CategoryId::new(row.try_get::<String, _>("id")?),
                    name: row.try_get("name")?,
                    active: row.try_get("active")?,
                })
            })
            .collect()
    }

    // ----- products ---------------------------------------------------

    /// Replace the whole product replica (already demand-adjusted by the
    /// catalog sync).
    pub async fn save_products(&self, products: &[Product]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, price, stock, category_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(product.id.as_str())
            .bind(&product.name)
            .bind(product.price)
            .bind(product.stock)
            .bind(product.category.as_ref().map(CategoryId::as_str))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn load_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, price, stock, category_id FROM products ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    pub async fn load_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price, stock, category_id FROM products WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    // ----- pending sales ----------------------------------------------

    /// Insert or update a pending sale, keyed by sale id.
    ///
    /// Upsert keeps retries idempotent and lets the reconciliation engine
    /// persist per-line `applied` progress mid-run.
    pub async fn enqueue_pending_sale(&self, sale: &Sale) -> Result<(), StoreError> {
        let lines = encode_lines(&sale.lines)?;

        sqlx::query(
            r#"
            INSERT INTO pending_sales (
                id, vendor_id, client, lines, total, vendor_name, created_at, error
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
            ON CONFLICT(id) DO UPDATE SET
                lines = excluded.lines,
                total = excluded.total
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.vendor_id.as_str())
        .bind(&sale.client)
        .bind(lines)
        .bind(sale.total)
        .bind(&sale.vendor_name)
        .bind(sale.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All pending sales for a vendor, in insertion (creation) order.
    pub async fn list_pending_sales(&self, vendor_id: &VendorId) -> Result<Vec<Sale>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, vendor_id, client, lines, total, vendor_name, created_at
            FROM pending_sales
            WHERE vendor_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(vendor_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_sale(row, SaleStatus::Pending))
            .collect()
    }

    pub async fn pending_count(&self, vendor_id: &VendorId) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_sales WHERE vendor_id = ?1")
                .bind(vendor_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    /// Delete a pending sale by id. A no-op when absent, not an error.
    pub async fn remove_pending_sale(&self, id: SaleId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM pending_sales WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record the last reconciliation failure on a queued sale.
    pub async fn mark_pending_error(&self, id: SaleId, error: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE pending_sales SET error = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ----- completed sales --------------------------------------------

    pub async fn save_completed_sale(&self, sale: &Sale) -> Result<(), StoreError> {
        let lines = encode_lines(&sale.lines)?;

        sqlx::query(
            r#"
            INSERT INTO completed_sales (
                id, vendor_id, client, lines, total, vendor_name, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.vendor_id.as_str())
        .bind(&sale.client)
        .bind(lines)
        .bind(sale.total)
        .bind(&sale.vendor_name)
        .bind(sale.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_completed_sales(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Vec<Sale>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, vendor_id, client, lines, total, vendor_name, created_at
            FROM completed_sales
            WHERE vendor_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(vendor_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_sale(row, SaleStatus::Completed))
            .collect()
    }

    /// Move a sale from the pending table to the completed table as one
    /// transaction: a crash can never leave the sale in neither table.
    pub async fn complete_sale(&self, sale: &Sale) -> Result<(), StoreError> {
        let lines = encode_lines(&sale.lines)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM pending_sales WHERE id = ?1")
            .bind(sale.id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO completed_sales (
                id, vendor_id, client, lines, total, vendor_name, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.vendor_id.as_str())
        .bind(&sale.client)
        .bind(lines)
        .bind(sale.total)
        .bind(&sale.vendor_name)
        .bind(sale.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ----- session ----------------------------------------------------

    /// Rewrite the single last-activity row.
    pub async fn record_activity(&self, timestamp: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO session (id, last_activity)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET last_activity = excluded.last_activity
            "#,
        )
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn read_last_activity(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT last_activity FROM session WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        row.map(|s| parse_timestamp(&s)).transpose()
    }

    // ----- current cart -----------------------------------------------

    /// Persist the scoped "current cart" record so it survives a reload.
    pub async fn save_cart(
        &self,
        vendor_id: &VendorId,
        lines: &[CartLine],
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(lines).map_err(StoreError::io)?;

        sqlx::query(
            r#"
            INSERT INTO carts (vendor_id, lines, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(vendor_id) DO UPDATE SET
                lines = excluded.lines,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(vendor_id.as_str())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_cart(&self, vendor_id: &VendorId) -> Result<Vec<CartLine>, StoreError> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT lines FROM carts WHERE vendor_id = ?1")
                .bind(vendor_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(payload) => serde_json::from_str(&payload).map_err(StoreError::io),
            None => Ok(Vec::new()),
        }
    }

    pub async fn clear_cart(&self, vendor_id: &VendorId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM carts WHERE vendor_id = ?1")
            .bind(vendor_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn encode_lines(lines: &[SaleLine]) -> Result<String, StoreError> {
    serde_json::to_string(lines).map_err(StoreError::io)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::io(format!("invalid timestamp in store: {e}")))
}

fn row_to_product(row: &SqliteRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        category: row
            .try_get::<Option<String>, _>("category_id")?
            .map(CategoryId::new),
    })
}

fn row_to_sale(row: &SqliteRow, status: SaleStatus) -> Result<Sale, StoreError> {
    let id_str: String = row.try_get("id")?;
    let id = SaleId::from_str(&id_str)
        .map_err(|e| StoreError::io(format!("invalid sale id in store: {e}")))?;

    let lines_str: String = row.try_get("lines")?;
    let lines: Vec<SaleLine> = serde_json::from_str(&lines_str)
        .map_err(|e| StoreError::io(format!("invalid sale lines in store: {e}")))?;

    let created_at_str: String = row.try_get("created_at")?;

    Ok(Sale {
        id,
        vendor_id: VendorId::new(row.try_get::<String, _>("vendor_id")?),
        client: row.try_get("client")?,
        lines,
        total: row.try_get("total")?,
        vendor_name: row.try_get("vendor_name")?,
        created_at: parse_timestamp(&created_at_str)?,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mostrador_sales::Cart;

    fn product(id: &str, stock: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("product {id}"),
            price: 3.5,
            stock,
            category: Some(CategoryId::from("general")),
        }
    }

    fn sale_for(vendor: &str, product_id: &str, qty: u32) -> Sale {
        let mut cart = Cart::new();
        cart.add_line(&product(product_id, 1_000), qty).unwrap();
        Sale::from_cart(&cart, "Cliente General", VendorId::from(vendor), "Maria", Utc::now())
    }

    #[tokio::test]
    async fn products_full_replace() {
        let store = LocalStore::open_in_memory().await.unwrap();

        store
            .save_products(&[product("a", 5), product("b", 2)])
            .await
            .unwrap();
        store.save_products(&[product("c", 9)]).await.unwrap();

        let products = store.load_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, ProductId::from("c"));
        assert_eq!(products[0].stock, 9);
    }

    #[tokio::test]
    async fn categories_full_replace() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let cat = |id: &str| Category {
            id: CategoryId::from(id),
            name: id.to_uppercase(),
            active: true,
        };

        store.save_categories(&[cat("ropa"), cat("comida")]).await.unwrap();
        store.save_categories(&[cat("ropa")]).await.unwrap();

        let categories = store.load_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, CategoryId::from("ropa"));
    }

    #[tokio::test]
    async fn pending_sale_roundtrip_preserves_lines_and_total() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let vendor = VendorId::from("v1");
        let sale = sale_for("v1", "a", 3);

        store.enqueue_pending_sale(&sale).await.unwrap();

        let pending = store.list_pending_sales(&vendor).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, sale.id);
        assert_eq!(pending[0].lines, sale.lines);
        assert!((pending[0].total - sale.total).abs() < 1e-9);
        assert_eq!(pending[0].status, SaleStatus::Pending);
    }

    #[tokio::test]
    async fn pending_sales_are_scoped_by_vendor_in_insertion_order() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut first = sale_for("v1", "a", 1);
        let mut second = sale_for("v1", "b", 2);
        first.created_at = Utc::now() - Duration::minutes(2);
        second.created_at = Utc::now() - Duration::minutes(1);
        let other = sale_for("v2", "a", 1);

        store.enqueue_pending_sale(&second).await.unwrap();
        store.enqueue_pending_sale(&first).await.unwrap();
        store.enqueue_pending_sale(&other).await.unwrap();

        let pending = store.list_pending_sales(&VendorId::from("v1")).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
        assert_eq!(store.pending_count(&VendorId::from("v2")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn enqueue_is_an_upsert() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let vendor = VendorId::from("v1");
        let mut sale = sale_for("v1", "a", 3);

        store.enqueue_pending_sale(&sale).await.unwrap();
        sale.lines[0].applied = true;
        store.enqueue_pending_sale(&sale).await.unwrap();

        let pending = store.list_pending_sales(&vendor).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].lines[0].applied);
    }

    #[tokio::test]
    async fn remove_pending_sale_is_a_noop_when_absent() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store.remove_pending_sale(SaleId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn complete_sale_moves_between_tables_atomically() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let vendor = VendorId::from("v1");
        let mut sale = sale_for("v1", "a", 3);

        store.enqueue_pending_sale(&sale).await.unwrap();
        sale.lines.iter_mut().for_each(|l| l.applied = true);
        sale.mark_completed();
        store.complete_sale(&sale).await.unwrap();

        // Exactly one table holds the sale afterwards.
        assert!(store.list_pending_sales(&vendor).await.unwrap().is_empty());
        let completed = store.list_completed_sales(&vendor).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, sale.id);
        assert_eq!(completed[0].status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn mark_pending_error_keeps_the_sale_queued() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let vendor = VendorId::from("v1");
        let sale = sale_for("v1", "a", 3);

        store.enqueue_pending_sale(&sale).await.unwrap();
        store
            .mark_pending_error(sale.id, "insufficient remote stock")
            .await
            .unwrap();

        assert_eq!(store.pending_count(&vendor).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn activity_row_is_rewritten_in_place() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert!(store.read_last_activity().await.unwrap().is_none());

        let first = Utc::now() - Duration::minutes(10);
        let second = Utc::now();
        store.record_activity(first).await.unwrap();
        store.record_activity(second).await.unwrap();

        let stored = store.read_last_activity().await.unwrap().unwrap();
        assert!((stored - second).num_seconds().abs() < 1);
    }

    #[tokio::test]
    async fn cart_survives_reload_and_clears() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let vendor = VendorId::from("v1");

        let mut cart = Cart::new();
        cart.add_line(&product("a", 10), 2).unwrap();
        store.save_cart(&vendor, cart.lines()).await.unwrap();

        let reloaded = Cart::from_lines(store.load_cart(&vendor).await.unwrap());
        assert_eq!(reloaded, cart);

        store.clear_cart(&vendor).await.unwrap();
        assert!(store.load_cart(&vendor).await.unwrap().is_empty());
    }
}
