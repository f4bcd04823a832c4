//! Catalog schema definitions
//!
//! The miner only reads these tables. The schema is exposed so fixtures and
//! import tooling can create a compatible database.

use rusqlite::Connection;

/// SQL schema for the catalog database
pub const SCHEMA_SQL: &str = r#"
-- Product definitions group attribute schemas
CREATE TABLE IF NOT EXISTS product_defs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Categories to mine, each pointing at a product definition
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    product_def_id INTEGER REFERENCES product_defs(id)
);

CREATE INDEX IF NOT EXISTS idx_categories_name ON categories(name);

-- Required attributes per product definition
CREATE TABLE IF NOT EXISTS product_def_attributes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_def_id INTEGER NOT NULL REFERENCES product_defs(id),
    name TEXT NOT NULL,
    datatype TEXT NOT NULL DEFAULT 'STRING',
    display_name TEXT,
    default_value TEXT,
    validation_rules TEXT,
    UNIQUE(product_def_id, name)
);

CREATE INDEX IF NOT EXISTS idx_attributes_def ON product_def_attributes(product_def_id);
"#;

/// Creates the catalog tables if they do not exist
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
