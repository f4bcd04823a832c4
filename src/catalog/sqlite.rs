//! SQLite catalog implementation

use crate::catalog::traits::{Catalog, CatalogError, CatalogResult};
use crate::catalog::{AttributeDefinition, CategoryRecord, Datatype};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Catalog backed by a SQLite database opened read-only
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Opens an existing catalog database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCatalog)` - Successfully opened database
    /// * `Err(CatalogError)` - Missing file or failed to open
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.display().to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self { conn })
    }

    /// Wraps an already open connection (for tests and fixtures)
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl Catalog for SqliteCatalog {
    fn load_categories(&self) -> CatalogResult<Vec<CategoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.description, c.product_def_id, pd.name
             FROM categories c
             LEFT JOIN product_defs pd ON c.product_def_id = pd.id
             ORDER BY c.id",
        )?;

        let categories = stmt
            .query_map([], |row| {
                Ok(CategoryRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    product_def_id: row.get(3)?,
                    product_def_name: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    fn required_attributes(
        &self,
        category: &CategoryRecord,
    ) -> CatalogResult<Vec<AttributeDefinition>> {
        let Some(product_def_id) = category.product_def_id else {
            return Ok(Vec::new());
        };

        let mut stmt = self.conn.prepare(
            "SELECT name, datatype, display_name, default_value, validation_rules
             FROM product_def_attributes
             WHERE product_def_id = ?1
             ORDER BY name",
        )?;

        let rows = stmt
            .query_map(params![product_def_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let attributes = rows
            .into_iter()
            .map(
                |(name, datatype, display_name, default_value, rules)| AttributeDefinition {
                    validation_rules: parse_validation_rules(&name, rules.as_deref()),
                    name,
                    datatype: Datatype::parse(&datatype),
                    display_name,
                    default_value,
                },
            )
            .collect();

        Ok(attributes)
    }
}

fn parse_validation_rules(attribute: &str, raw: Option<&str>) -> serde_json::Value {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return serde_json::Value::Object(Default::default());
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "Ignoring malformed validation rules for attribute '{}': {}",
                attribute,
                e
            );
            serde_json::Value::Object(Default::default())
        }
    }
}
