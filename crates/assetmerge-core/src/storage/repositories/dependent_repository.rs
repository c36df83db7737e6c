use chrono::Utc;
use rusqlite::{Connection, params};
use std::sync::MutexGuard;

use crate::error::{AssetError, Result};
use crate::models::{
    AssetId, DependentKind, InventoryLevel, InventoryMove, LocationId, plan_inventory_relink,
};

/// Rows in the plain foreign-key tables: transactions, allocations and
/// request items.
pub trait DependentRepository {
    /// Point every row of `kind` owned by `from` at `to`. Inventory levels
    /// are keyed by location and go through [`InventoryRepository::relink`].
    fn relink(&self, from: &AssetId, to: &AssetId, kind: DependentKind) -> Result<usize>;
    fn count_for(&self, asset_id: &AssetId, kind: DependentKind) -> Result<usize>;
    fn insert_location(&self, name: &str) -> Result<LocationId>;
    fn insert_transaction(&self, asset_id: &AssetId, kind: &str, quantity: i64) -> Result<i64>;
    fn insert_allocation(&self, asset_id: &AssetId, allocated_to: &str) -> Result<i64>;
    fn insert_request_item(&self, request_id: i64, asset_id: &AssetId, quantity: i64)
    -> Result<i64>;
}

/// Per-location stock rows, keyed uniquely by `(asset_id, location_id)`.
pub trait InventoryRepository {
    fn for_asset(&self, asset_id: &AssetId) -> Result<Vec<InventoryLevel>>;
    fn insert(
        &self,
        asset_id: &AssetId,
        location_id: &LocationId,
        on_hand: i64,
        allocated: i64,
    ) -> Result<i64>;
    /// Move all of `from`'s inventory onto `to`, summing rows that share a
    /// location. Returns the number of source rows handled.
    fn relink(&self, from: &AssetId, to: &AssetId) -> Result<usize>;
}

pub struct SqliteDependentRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteDependentRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

impl<'a> DependentRepository for SqliteDependentRepository<'a> {
    fn relink(&self, from: &AssetId, to: &AssetId, kind: DependentKind) -> Result<usize> {
        if kind == DependentKind::InventoryLevels {
            return Err(AssetError::ValidationError(
                "inventory levels are relinked by location".to_string(),
            ));
        }
        let sql = format!(
            "UPDATE {} SET asset_id = ?1 WHERE asset_id = ?2",
            kind.table()
        );
        let moved = self.conn.execute(&sql, params![to, from])?;
        Ok(moved)
    }

    fn count_for(&self, asset_id: &AssetId, kind: DependentKind) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE asset_id = ?1", kind.table());
        let count: i64 = self.conn.query_row(&sql, params![asset_id], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert_location(&self, name: &str) -> Result<LocationId> {
        self.conn.execute(
            "INSERT INTO locations (location_name) VALUES (?1)",
            params![name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_transaction(&self, asset_id: &AssetId, kind: &str, quantity: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions (asset_id, transaction_type, quantity, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![asset_id, kind, quantity, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_allocation(&self, asset_id: &AssetId, allocated_to: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO allocations (asset_id, allocated_to, created_at) VALUES (?1, ?2, ?3)",
            params![asset_id, allocated_to, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_request_item(
        &self,
        request_id: i64,
        asset_id: &AssetId,
        quantity: i64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO request_items (request_id, asset_id, quantity) VALUES (?1, ?2, ?3)",
            params![request_id, asset_id, quantity],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

pub struct SqliteInventoryRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteInventoryRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn row_to_level(row: &rusqlite::Row) -> rusqlite::Result<InventoryLevel> {
        Ok(InventoryLevel {
            inventory_id: row.get(0)?,
            asset_id: row.get(1)?,
            location_id: row.get(2)?,
            quantity_on_hand: row.get(3)?,
            quantity_allocated: row.get(4)?,
        })
    }

    fn location_exists(&self, location_id: &LocationId) -> Result<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM locations WHERE location_id = ?1")?
            .exists(params![location_id])?;
        Ok(exists)
    }

    fn apply(&self, target: &AssetId, step: &InventoryMove, source: &InventoryLevel) -> Result<()> {
        match step {
            InventoryMove::Sum {
                into,
                from,
                on_hand,
                allocated,
            } => {
                self.conn.execute(
                    "UPDATE inventory_levels
                     SET quantity_on_hand = quantity_on_hand + ?1,
                         quantity_allocated = quantity_allocated + ?2
                     WHERE inventory_id = ?3",
                    params![on_hand, allocated, into],
                )?;
                self.conn.execute(
                    "DELETE FROM inventory_levels WHERE inventory_id = ?1",
                    params![from],
                )?;
            }
            InventoryMove::Rekey { inventory_id } => {
                if !self.location_exists(&source.location_id)? {
                    return Err(AssetError::LocationNotFound(source.location_id));
                }
                self.conn.execute(
                    "UPDATE inventory_levels SET asset_id = ?1 WHERE inventory_id = ?2",
                    params![target, inventory_id],
                )?;
            }
        }
        Ok(())
    }
}

impl<'a> InventoryRepository for SqliteInventoryRepository<'a> {
    fn for_asset(&self, asset_id: &AssetId) -> Result<Vec<InventoryLevel>> {
        let mut stmt = self.conn.prepare(
            "SELECT inventory_id, asset_id, location_id, quantity_on_hand, quantity_allocated
             FROM inventory_levels WHERE asset_id = ?1 ORDER BY location_id",
        )?;
        let rows = stmt
            .query_map(params![asset_id], Self::row_to_level)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(
        &self,
        asset_id: &AssetId,
        location_id: &LocationId,
        on_hand: i64,
        allocated: i64,
    ) -> Result<i64> {
        if !self.location_exists(location_id)? {
            return Err(AssetError::LocationNotFound(*location_id));
        }
        self.conn.execute(
            "INSERT INTO inventory_levels
                (asset_id, location_id, quantity_on_hand, quantity_allocated)
             VALUES (?1, ?2, ?3, ?4)",
            params![asset_id, location_id, on_hand, allocated],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn relink(&self, from: &AssetId, to: &AssetId) -> Result<usize> {
        let source = self.for_asset(from)?;
        if source.is_empty() {
            return Ok(0);
        }
        let target = self.for_asset(to)?;
        let plan = plan_inventory_relink(&source, &target);
        for (step, row) in plan.iter().zip(&source) {
            self.apply(to, step, row)?;
        }
        Ok(plan.len())
    }
}
