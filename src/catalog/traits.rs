//! Catalog trait and error types

use crate::catalog::{AttributeDefinition, CategoryRecord};
use thiserror::Error;

/// Errors that can occur while reading the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog database not found: {0}")]
    NotFound(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read-only source of categories and their required attributes
///
/// The miner never writes to the catalog; populating it is the job of
/// separate import tooling.
pub trait Catalog {
    /// Returns every category in catalog order (ascending id)
    fn load_categories(&self) -> CatalogResult<Vec<CategoryRecord>>;

    /// Returns the required-attribute schema of a category
    ///
    /// Categories without a product definition have an empty schema.
    fn required_attributes(&self, category: &CategoryRecord)
        -> CatalogResult<Vec<AttributeDefinition>>;
}
