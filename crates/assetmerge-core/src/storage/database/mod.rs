mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::{SCHEMA_VERSION, init_schema, verify_tables};

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::error::{AssetError, Result};
use crate::models::{
    AssetId, AssetPatch, AssetRecord, DependentKind, InventoryLevel, LocationId, NewAsset,
};

use super::AssetStore;
use super::repositories::{
    AssetRepository, DependentRepository, InventoryRepository, Repository,
    SqliteAssetRepository, SqliteDependentRepository, SqliteInventoryRepository,
};

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// Row counts across the store, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub assets: usize,
    pub locations: usize,
    pub transactions: usize,
    pub allocations: usize,
    pub request_items: usize,
    pub inventory_levels: usize,
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
}

/// SQLite-backed asset store.
pub struct SqliteAssetStore {
    pool: ConnectionPool,
}

impl SqliteAssetStore {
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn assets(&self) -> SqliteAssetRepository<'_> {
        SqliteAssetRepository::new(self.pool.get_connection())
    }

    fn dependents(&self) -> SqliteDependentRepository<'_> {
        SqliteDependentRepository::new(self.pool.get_connection())
    }

    fn inventory(&self) -> SqliteInventoryRepository<'_> {
        SqliteInventoryRepository::new(self.pool.get_connection())
    }

    pub fn insert_asset(&self, asset: &NewAsset) -> Result<AssetId> {
        self.assets().insert(asset)
    }

    pub fn count_assets(&self) -> Result<usize> {
        self.assets().count()
    }

    pub fn insert_location(&self, name: &str) -> Result<LocationId> {
        self.dependents().insert_location(name)
    }

    pub fn insert_inventory_level(
        &self,
        asset_id: AssetId,
        location_id: LocationId,
        on_hand: i64,
        allocated: i64,
    ) -> Result<i64> {
        self.inventory()
            .insert(&asset_id, &location_id, on_hand, allocated)
    }

    pub fn insert_transaction(&self, asset_id: AssetId, kind: &str, quantity: i64) -> Result<i64> {
        self.dependents().insert_transaction(&asset_id, kind, quantity)
    }

    pub fn insert_allocation(&self, asset_id: AssetId, allocated_to: &str) -> Result<i64> {
        self.dependents().insert_allocation(&asset_id, allocated_to)
    }

    pub fn insert_request_item(
        &self,
        request_id: i64,
        asset_id: AssetId,
        quantity: i64,
    ) -> Result<i64> {
        self.dependents()
            .insert_request_item(request_id, &asset_id, quantity)
    }

    pub fn inventory_for(&self, asset_id: AssetId) -> Result<Vec<InventoryLevel>> {
        self.inventory().for_asset(&asset_id)
    }

    pub fn count_dependents(&self, asset_id: AssetId, kind: DependentKind) -> Result<usize> {
        self.dependents().count_for(&asset_id, kind)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.pool.get_connection();
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        let (quantity_on_hand, quantity_allocated): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(quantity_on_hand), 0), COALESCE(SUM(quantity_allocated), 0)
             FROM inventory_levels",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            assets: count("assets")?,
            locations: count("locations")?,
            transactions: count("transactions")?,
            allocations: count("allocations")?,
            request_items: count("request_items")?,
            inventory_levels: count("inventory_levels")?,
            quantity_on_hand,
            quantity_allocated,
        })
    }
}

impl AssetStore for SqliteAssetStore {
    fn verify_schema(&self) -> Result<()> {
        verify_tables(&self.pool.get_connection())
    }

    fn list_all(&self) -> Result<Vec<AssetRecord>> {
        self.assets().list_all()
    }

    fn get_by_id(&self, id: AssetId) -> Result<Option<AssetRecord>> {
        self.assets().find_by_id(&id)
    }

    fn update_fields(&self, id: AssetId, patch: &AssetPatch) -> Result<()> {
        self.assets().update_fields(&id, patch)
    }

    fn delete_by_id(&self, id: AssetId) -> Result<bool> {
        self.assets().delete(&id)
    }

    fn relink_dependents(
        &self,
        from: AssetId,
        to: AssetId,
        kind: DependentKind,
    ) -> Result<usize> {
        match kind {
            DependentKind::InventoryLevels => self.inventory().relink(&from, &to),
            _ => self.dependents().relink(&from, &to, kind),
        }
    }

    fn with_transaction<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<AssetError>,
    {
        self.pool
            .get_connection()
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(AssetError::from)?;
        let mut tx = TransactionGuard {
            pool: &self.pool,
            finished: false,
        };

        match work() {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}

/// Rolls back an open transaction unless it was committed, including when
/// the work closure unwinds.
struct TransactionGuard<'a> {
    pool: &'a ConnectionPool,
    finished: bool,
}

impl TransactionGuard<'_> {
    fn commit(&mut self) -> Result<()> {
        self.pool.get_connection().execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    fn rollback(&mut self) {
        self.finished = true;
        let conn = self.pool.get_connection();
        if conn.is_autocommit() {
            return;
        }
        if let Err(err) = conn.execute_batch("ROLLBACK") {
            warn!(error = %err, "rollback failed");
        }
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded() -> (SqliteAssetStore, AssetId, AssetId) {
        let store = SqliteAssetStore::open_in_memory().unwrap();
        let a = store.insert_asset(&NewAsset::named("Drill")).unwrap();
        let b = store.insert_asset(&NewAsset::named("Drill")).unwrap();
        (store, a, b)
    }

    #[test]
    fn open_on_disk_runs_migrations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("assets.db");
        let store = SqliteAssetStore::open(&path).unwrap();
        store.verify_schema().unwrap();
        assert!(path.exists());

        let versions = get_applied_versions(&store.pool().get_connection()).unwrap();
        assert_eq!(versions.last().copied(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn verify_schema_fails_fatally_without_dependent_table() {
        let store = SqliteAssetStore::open_in_memory().unwrap();
        store
            .pool()
            .get_connection()
            .execute_batch("DROP TABLE allocations;")
            .unwrap();
        let err = store.verify_schema().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn transaction_commits_on_ok() {
        let (store, a, b) = seeded();
        store.insert_transaction(b, "checkout", 1).unwrap();

        let moved: Result<usize> = store.with_transaction(|| {
            let n = store.relink_dependents(b, a, DependentKind::Transactions)?;
            store.delete_by_id(b)?;
            Ok(n)
        });
        assert_eq!(moved.unwrap(), 1);
        assert!(store.get_by_id(b).unwrap().is_none());
        assert_eq!(store.count_dependents(a, DependentKind::Transactions).unwrap(), 1);
    }

    #[test]
    fn transaction_rolls_back_on_err() {
        let (store, a, b) = seeded();
        store.insert_allocation(b, "Site A").unwrap();

        let result: Result<()> = store.with_transaction(|| {
            store.relink_dependents(b, a, DependentKind::Allocations)?;
            store.delete_by_id(b)?;
            Err(AssetError::ValidationError("boom".into()))
        });
        assert!(result.is_err());
        assert!(store.get_by_id(b).unwrap().is_some());
        assert_eq!(store.count_dependents(b, DependentKind::Allocations).unwrap(), 1);
        assert_eq!(store.count_dependents(a, DependentKind::Allocations).unwrap(), 0);
    }

    #[test]
    fn deleting_referenced_asset_is_a_constraint_error() {
        let (store, _, b) = seeded();
        store.insert_request_item(77, b, 2).unwrap();

        let err = store.delete_by_id(b).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn inventory_relink_conserves_totals() {
        let (store, a, b) = seeded();
        let shop = store.insert_location("Shop").unwrap();
        let yard = store.insert_location("Yard").unwrap();
        store.insert_inventory_level(a, shop, 2, 1).unwrap();
        store.insert_inventory_level(b, shop, 3, 0).unwrap();
        store.insert_inventory_level(b, yard, 6, 2).unwrap();
        let before = store.stats().unwrap();

        let rows = store
            .relink_dependents(b, a, DependentKind::InventoryLevels)
            .unwrap();
        assert_eq!(rows, 2);

        let after = store.stats().unwrap();
        assert_eq!(after.quantity_on_hand, before.quantity_on_hand);
        assert_eq!(after.quantity_allocated, before.quantity_allocated);
        assert_eq!(after.inventory_levels, 2);
        assert!(store.inventory_for(b).unwrap().is_empty());
    }

    #[test]
    fn update_fields_on_missing_asset() {
        let store = SqliteAssetStore::open_in_memory().unwrap();
        let err = store.update_fields(5, &AssetPatch::default()).unwrap_err();
        assert!(matches!(err, AssetError::AssetNotFound(5)));
    }
}
