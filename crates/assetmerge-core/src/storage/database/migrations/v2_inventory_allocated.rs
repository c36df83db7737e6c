use rusqlite::Connection;

use super::Migration;
use crate::error::Result;

pub struct V2InventoryAllocated;

impl Migration for V2InventoryAllocated {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Add quantity_allocated to inventory_levels"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        // Stores created from older dumps only tracked on-hand quantity.
        let has_allocated: bool = conn
            .prepare(
                "SELECT 1 FROM pragma_table_info('inventory_levels') WHERE name='quantity_allocated'",
            )?
            .exists([])?;

        if !has_allocated {
            conn.execute_batch(
                "ALTER TABLE inventory_levels
                     ADD COLUMN quantity_allocated INTEGER NOT NULL DEFAULT 0;",
            )?;
        }
        Ok(())
    }
}
