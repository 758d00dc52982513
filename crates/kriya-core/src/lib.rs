pub mod app_config;
pub mod catalog;
pub mod config;
pub mod order;
pub mod sample;
pub mod slug;
pub mod store;
pub mod tenant;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{CatalogCategory, CatalogProduct, ProductVariant, SocialLinks, StoreConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use order::OrderStatus;
pub use slug::{slugify, validate_store_slug};
pub use store::{Plan, SyncStatus, Theme};
pub use tenant::{resolve_identifier, ResolverConfig, StoreIdentifier};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Input that violates a domain rule (slug shape, enum value, price sign).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("slug must be at least {min} characters")]
    SlugTooShort { min: usize },

    #[error("slug must be lowercase alphanumeric with hyphens, starting and ending with a letter or digit")]
    SlugInvalidFormat,

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("cannot move order from '{from}' to '{to}'")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },
}
