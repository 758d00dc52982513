//! Database operations for `categories` and `products`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `categories` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub store_id: Uuid,
    /// Spreadsheet row id; the re-sync idempotency key.
    pub external_id: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub images: Vec<String>,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub in_stock: bool,
    pub stock_quantity: Option<i32>,
    pub variants: Option<serde_json::Value>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product joined with its category's slug (`NULL` when uncategorized).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProductWithCategoryRow {
    #[sqlx(flatten)]
    pub product: ProductRow,
    pub category_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub external_id: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub images: Vec<String>,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub in_stock: bool,
    pub stock_quantity: Option<i32>,
    pub variants: Option<serde_json::Value>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Sparse product update; `None` leaves a column untouched.
///
/// The `clear_*` flags set their nullable column to `NULL` and take
/// precedence over a value supplied for the same column.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub in_stock: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
    pub clear_description: bool,
    pub clear_compare_at_price: bool,
    pub clear_category: bool,
}

const CATEGORY_COLUMNS: &str =
    "id, store_id, name, slug, description, image_url, sort_order, is_active, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "p.id, p.store_id, p.external_id, p.name, p.slug, p.description, \
     p.price, p.compare_at_price, p.images, p.category_id, p.tags, p.in_stock, \
     p.stock_quantity, p.variants, p.is_active, p.sort_order, p.created_at, p.updated_at";

/// Escapes `\`, `%` and `_` so user input matches literally inside `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Storefront reads (active only, sort_order ascending)
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_categories(
    pool: &PgPool,
    store_id: Uuid,
) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories \
         WHERE store_id = $1 AND is_active = true \
         ORDER BY sort_order, name"
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_products(
    pool: &PgPool,
    store_id: Uuid,
) -> Result<Vec<ProductWithCategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductWithCategoryRow>(&format!(
        "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug \
         FROM products p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.store_id = $1 AND p.is_active = true \
         ORDER BY p.sort_order, p.id"
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Active products whose category has `category_slug`. An unknown slug yields
/// an empty list.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_products_by_category(
    pool: &PgPool,
    store_id: Uuid,
    category_slug: &str,
) -> Result<Vec<ProductWithCategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductWithCategoryRow>(&format!(
        "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug \
         FROM products p JOIN categories c ON c.id = p.category_id \
         WHERE p.store_id = $1 AND p.is_active = true AND c.slug = $2 \
         ORDER BY p.sort_order, p.id"
    ))
    .bind(store_id)
    .bind(category_slug)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Case-insensitive substring search over name and description.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_active_products(
    pool: &PgPool,
    store_id: Uuid,
    query: &str,
) -> Result<Vec<ProductWithCategoryRow>, DbError> {
    let pattern = format!("%{}%", escape_like(query));
    let rows = sqlx::query_as::<_, ProductWithCategoryRow>(&format!(
        "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug \
         FROM products p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.store_id = $1 AND p.is_active = true \
           AND (p.name ILIKE $2 OR p.description ILIKE $2) \
         ORDER BY p.sort_order, p.id"
    ))
    .bind(store_id)
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_active_product(
    pool: &PgPool,
    store_id: Uuid,
    product_id: Uuid,
) -> Result<Option<ProductWithCategoryRow>, DbError> {
    let row = sqlx::query_as::<_, ProductWithCategoryRow>(&format!(
        "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug \
         FROM products p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.store_id = $1 AND p.id = $2 AND p.is_active = true"
    ))
    .bind(store_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Dashboard CRUD (includes inactive rows)
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_store_categories(
    pool: &PgPool,
    store_id: Uuid,
) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE store_id = $1 ORDER BY sort_order, name"
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_store_products(
    pool: &PgPool,
    store_id: Uuid,
) -> Result<Vec<ProductWithCategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductWithCategoryRow>(&format!(
        "SELECT {PRODUCT_COLUMNS}, c.slug AS category_slug \
         FROM products p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.store_id = $1 \
         ORDER BY p.sort_order, p.id"
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// True when `category_id` names a category of `store_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_in_store(
    pool: &PgPool,
    store_id: Uuid,
    category_id: Uuid,
) -> Result<bool, DbError> {
    let found = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1 AND store_id = $2)",
    )
    .bind(category_id)
    .bind(store_id)
    .fetch_one(pool)
    .await?;

    Ok(found)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`]; a duplicate slug within the store is a unique
/// violation.
pub async fn create_category(
    pool: &PgPool,
    store_id: Uuid,
    new: &NewCategory,
) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "INSERT INTO categories (id, store_id, name, slug, description, image_url, sort_order, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(store_id)
    .bind(&new.name)
    .bind(&new.slug)
    .bind(new.description.as_deref())
    .bind(new.image_url.as_deref())
    .bind(new.sort_order)
    .bind(new.is_active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Deletes a category; its products become uncategorized.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such category exists in the store.
pub async fn delete_category(
    pool: &PgPool,
    store_id: Uuid,
    category_id: Uuid,
) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND store_id = $2")
        .bind(category_id)
        .bind(store_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`]; a duplicate external id within the store is a
/// unique violation.
pub async fn create_product(
    pool: &PgPool,
    store_id: Uuid,
    new: &NewProduct,
) -> Result<ProductRow, DbError> {
    let mut conn = pool.acquire().await?;
    let id = insert_product(&mut conn, store_id, new).await?;
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Applies a sparse update to a product in `store_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product is not in the store.
pub async fn update_product(
    pool: &PgPool,
    store_id: Uuid,
    product_id: Uuid,
    patch: &ProductPatch,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products p SET \
             name = COALESCE($3, p.name), \
             description = CASE WHEN $14 THEN NULL ELSE COALESCE($4, p.description) END, \
             price = COALESCE($5, p.price), \
             compare_at_price = CASE WHEN $15 THEN NULL ELSE COALESCE($6, p.compare_at_price) END, \
             images = COALESCE($7, p.images), \
             category_id = CASE WHEN $16 THEN NULL ELSE COALESCE($8, p.category_id) END, \
             tags = COALESCE($9, p.tags), \
             in_stock = COALESCE($10, p.in_stock), \
             stock_quantity = COALESCE($11, p.stock_quantity), \
             is_active = COALESCE($12, p.is_active), \
             sort_order = COALESCE($13, p.sort_order), \
             updated_at = NOW() \
         WHERE p.id = $1 AND p.store_id = $2 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(store_id)
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.price)
    .bind(patch.compare_at_price)
    .bind(patch.images.as_deref())
    .bind(patch.category_id)
    .bind(patch.tags.as_deref())
    .bind(patch.in_stock)
    .bind(patch.stock_quantity)
    .bind(patch.is_active)
    .bind(patch.sort_order)
    .bind(patch.clear_description)
    .bind(patch.clear_compare_at_price)
    .bind(patch.clear_category)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the product is not in the store.
pub async fn delete_product(
    pool: &PgPool,
    store_id: Uuid,
    product_id: Uuid,
) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND store_id = $2")
        .bind(product_id)
        .bind(store_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Import replaces
// ---------------------------------------------------------------------------

/// Replaces every category of the store with `categories` in one transaction.
/// Existing products keep their rows; their `category_id` is nulled by the
/// foreign key until the product replace runs.
///
/// Returns the number of inserted rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`]; on error nothing is committed.
pub async fn replace_categories(
    pool: &PgPool,
    store_id: Uuid,
    categories: &[NewCategory],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM categories WHERE store_id = $1")
        .bind(store_id)
        .execute(&mut *tx)
        .await?;

    for category in categories {
        insert_category(&mut tx, store_id, category).await?;
    }

    tx.commit().await?;
    Ok(categories.len())
}

/// Replaces every product of the store with `products` in one transaction.
///
/// Returns the number of inserted rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`]; on error nothing is committed.
pub async fn replace_products(
    pool: &PgPool,
    store_id: Uuid,
    products: &[NewProduct],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM products WHERE store_id = $1")
        .bind(store_id)
        .execute(&mut *tx)
        .await?;

    for product in products {
        insert_product(&mut tx, store_id, product).await?;
    }

    tx.commit().await?;
    Ok(products.len())
}

/// `slug -> id` for every category of the store.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_slug_map(
    pool: &PgPool,
    store_id: Uuid,
) -> Result<HashMap<String, Uuid>, DbError> {
    let rows = sqlx::query_as::<_, (String, Uuid)>(
        "SELECT slug, id FROM categories WHERE store_id = $1",
    )
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

async fn insert_category(
    conn: &mut PgConnection,
    store_id: Uuid,
    category: &NewCategory,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO categories (id, store_id, name, slug, description, image_url, sort_order, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(store_id)
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.description.as_deref())
    .bind(category.image_url.as_deref())
    .bind(category.sort_order)
    .bind(category.is_active)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_product(
    conn: &mut PgConnection,
    store_id: Uuid,
    product: &NewProduct,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, store_id, external_id, name, slug, description, price, \
                               compare_at_price, images, category_id, tags, in_stock, \
                               stock_quantity, variants, is_active, sort_order) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(id)
    .bind(store_id)
    .bind(product.external_id.as_deref())
    .bind(&product.name)
    .bind(&product.slug)
    .bind(product.description.as_deref())
    .bind(product.price)
    .bind(product.compare_at_price)
    .bind(&product.images)
    .bind(product.category_id)
    .bind(&product.tags)
    .bind(product.in_stock)
    .bind(product.stock_quantity)
    .bind(product.variants.as_ref())
    .bind(product.is_active)
    .bind(product.sort_order)
    .execute(conn)
    .await?;
    Ok(id)
}
