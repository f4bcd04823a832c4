//! Catalog module: categories and their required-attribute schemas
//!
//! The catalog is an external collaborator owned by import tooling. This
//! module only reads it:
//! - category records in catalog order
//! - per-category attribute definitions with datatypes and validation rules

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteCatalog;
pub use traits::{Catalog, CatalogError, CatalogResult};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A category from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub product_def_id: Option<i64>,
    pub product_def_name: Option<String>,
}

/// Declared datatype of a required attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Datatype {
    String,
    Number,
    Boolean,
    Date,
    Enum,
    /// Datatypes the validator has no check for
    Other(String),
}

impl Datatype {
    /// Parses a datatype name case-insensitively
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRING" | "TEXT" => Self::String,
            "NUMBER" | "INTEGER" | "FLOAT" | "DECIMAL" => Self::Number,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "DATE" => Self::Date,
            "ENUM" => Self::Enum,
            _ => Self::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Enum => "ENUM",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for Datatype {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Datatype> for String {
    fn from(datatype: Datatype) -> Self {
        datatype.as_str().to_string()
    }
}

/// One required attribute of a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub datatype: Datatype,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Structured constraints such as `{"allowed_values": [...], "min": 0}`
    #[serde(default)]
    pub validation_rules: serde_json::Value,
}

impl AttributeDefinition {
    /// Creates a definition with no default and no extra constraints
    pub fn new(name: &str, datatype: Datatype) -> Self {
        Self {
            name: name.to_string(),
            datatype,
            display_name: None,
            default_value: None,
            validation_rules: serde_json::Value::Object(Default::default()),
        }
    }
}

/// The list of attributes a category requires
pub type RequiredAttributeSchema = Vec<AttributeDefinition>;
