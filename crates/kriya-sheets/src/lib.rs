//! Google Sheets catalog import: HTTP client, row parsing and the sync
//! pipeline that replaces a store's catalog from its spreadsheet.

pub mod client;
pub mod error;
pub mod pipeline;
mod retry;
pub mod rows;

pub use client::SheetsClient;
pub use error::SheetsError;
pub use pipeline::{
    sync_all_stores, sync_store, BulkSyncSummary, CatalogStore, PgCatalogStore, SheetSource,
    SyncError, SyncOptions, SyncReport,
};
pub use rows::{
    parse_categories, parse_products, parse_store_config, CategoryRecord, ParsedSheet,
    ProductRecord, RowParse, CATEGORIES_RANGE, CONFIG_RANGE, PRODUCTS_RANGE,
};
