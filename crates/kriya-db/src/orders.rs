//! Database operations for the `orders` table.
//!
//! Orders are created by checkout outside this service; here they are only
//! listed and moved through their status lifecycle. Rows are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `orders` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub shipping_address: serde_json::Value,
    pub billing_address: Option<serde_json::Value>,
    pub items: serde_json::Value,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = "id, store_id, order_number, status, customer_email, customer_name, \
     customer_phone, shipping_address, billing_address, items, subtotal, shipping_cost, tax, \
     total, currency, payment_status, payment_method, payment_id, notes, created_at, updated_at";

/// Lists a store's orders, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(
    pool: &PgPool,
    store_id: Uuid,
    status: Option<&str>,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         WHERE store_id = $1 AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC, id"
    ))
    .bind(store_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the order is not in the store.
pub async fn get_order(pool: &PgPool, store_id: Uuid, order_id: Uuid) -> Result<OrderRow, DbError> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND store_id = $2"
    ))
    .bind(order_id)
    .bind(store_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Moves an order from `expected` to `next`. The `expected` guard makes a
/// concurrent change lose cleanly instead of overwriting.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order is missing or no longer in
/// `expected` status.
pub async fn update_order_status(
    pool: &PgPool,
    store_id: Uuid,
    order_id: Uuid,
    expected: &str,
    next: &str,
) -> Result<OrderRow, DbError> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET status = $4, updated_at = NOW() \
         WHERE id = $1 AND store_id = $2 AND status = $3 \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(store_id)
    .bind(expected)
    .bind(next)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
