mod v1_initial;
mod v2_inventory_allocated;

use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

pub trait Migration {
    fn version(&self) -> u32;
    fn description(&self) -> &'static str;
    fn up(&self, conn: &Connection) -> Result<()>;
}

fn record_migration(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![version, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn has_migrations_table(conn: &Connection) -> Result<bool> {
    let has_table: bool = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='schema_migrations'")?
        .exists([])?;
    Ok(has_table)
}

fn is_migration_applied(conn: &Connection, version: u32) -> Result<bool> {
    if !has_migrations_table(conn)? {
        return Ok(false);
    }

    let applied: bool = conn
        .prepare("SELECT 1 FROM schema_migrations WHERE version = ?1")?
        .exists(rusqlite::params![version])?;
    Ok(applied)
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let migrations: Vec<Box<dyn Migration>> = vec![
        Box::new(v1_initial::V1Initial),
        Box::new(v2_inventory_allocated::V2InventoryAllocated),
    ];

    for migration in migrations {
        if !is_migration_applied(conn, migration.version())? {
            debug!(
                version = migration.version(),
                description = migration.description(),
                "applying migration"
            );
            migration.up(conn)?;
            record_migration(conn, migration.version())?;
        }
    }

    Ok(())
}

pub fn get_applied_versions(conn: &Connection) -> Result<Vec<u32>> {
    if !has_migrations_table(conn)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut versions = Vec::new();
    for row in rows {
        versions.push(row?);
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::schema::SCHEMA_VERSION;

    #[test]
    fn fresh_database_records_every_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let versions = get_applied_versions(&conn).unwrap();
        assert_eq!(versions, (1..=SCHEMA_VERSION).collect::<Vec<_>>());
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_applied_versions(&conn).unwrap().len(), 2);
    }

    #[test]
    fn legacy_inventory_table_gains_allocated_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL);
            INSERT INTO schema_migrations VALUES (1, '2024-01-01T00:00:00Z');
            CREATE TABLE assets (asset_id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
            CREATE TABLE inventory_levels (
                inventory_id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset_id INTEGER NOT NULL,
                location_id INTEGER NOT NULL,
                quantity_on_hand INTEGER NOT NULL DEFAULT 0
            );
            ",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let has_column: bool = conn
            .prepare(
                "SELECT 1 FROM pragma_table_info('inventory_levels') WHERE name='quantity_allocated'",
            )
            .unwrap()
            .exists([])
            .unwrap();
        assert!(has_column);
        assert_eq!(get_applied_versions(&conn).unwrap(), vec![1, 2]);
    }
}
