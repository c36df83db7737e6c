use rusqlite::Connection;

use crate::error::{AssetError, Result};
use crate::models::DependentKind;

pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS assets (
            asset_id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name             TEXT,
            manufacturer     TEXT,
            model            TEXT,
            serial_number    TEXT,
            asset_tag        TEXT,
            description      TEXT,
            notes            TEXT,
            condition_status TEXT,
            purchase_date    TEXT,
            purchase_price   REAL,
            current_value    REAL,
            warranty_expiry  TEXT,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS locations (
            location_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            location_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            transaction_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id         INTEGER NOT NULL REFERENCES assets(asset_id),
            transaction_type TEXT NOT NULL,
            quantity         INTEGER NOT NULL DEFAULT 1,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS allocations (
            allocation_id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id      INTEGER NOT NULL REFERENCES assets(asset_id),
            allocated_to  TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS request_items (
            request_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
            request_id      INTEGER NOT NULL,
            asset_id        INTEGER NOT NULL REFERENCES assets(asset_id),
            quantity        INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS inventory_levels (
            inventory_id       INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id           INTEGER NOT NULL REFERENCES assets(asset_id),
            location_id        INTEGER NOT NULL REFERENCES locations(location_id),
            quantity_on_hand   INTEGER NOT NULL DEFAULT 0,
            quantity_allocated INTEGER NOT NULL DEFAULT 0,
            UNIQUE (asset_id, location_id)
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_assets_serial       ON assets(serial_number);
        CREATE INDEX IF NOT EXISTS idx_assets_tag          ON assets(asset_tag);
        CREATE INDEX IF NOT EXISTS idx_assets_name         ON assets(name);
        CREATE INDEX IF NOT EXISTS idx_transactions_asset  ON transactions(asset_id);
        CREATE INDEX IF NOT EXISTS idx_allocations_asset   ON allocations(asset_id);
        CREATE INDEX IF NOT EXISTS idx_request_items_asset ON request_items(asset_id);
        ",
    )?;
    Ok(())
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}

/// Fail with `MissingTable` unless the asset table and every dependent table
/// exist.
pub fn verify_tables(conn: &Connection) -> Result<()> {
    let required = std::iter::once("assets").chain(DependentKind::ALL.iter().map(|k| k.table()));
    for table in required {
        let exists: bool = conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1")?
            .exists([table])?;
        if !exists {
            return Err(AssetError::MissingTable(table.to_string()));
        }
    }
    Ok(())
}
