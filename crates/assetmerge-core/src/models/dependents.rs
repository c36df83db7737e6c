use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::asset::AssetId;

pub type LocationId = i64;

/// Entity types that reference an asset by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    Transactions,
    Allocations,
    RequestItems,
    /// Quantity-bearing, unique per (asset, location).
    InventoryLevels,
}

impl DependentKind {
    pub const ALL: [DependentKind; 4] = [
        DependentKind::Transactions,
        DependentKind::Allocations,
        DependentKind::RequestItems,
        DependentKind::InventoryLevels,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            DependentKind::Transactions => "transactions",
            DependentKind::Allocations => "allocations",
            DependentKind::RequestItems => "request_items",
            DependentKind::InventoryLevels => "inventory_levels",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// On-hand and allocated quantity of one asset at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub inventory_id: i64,
    pub asset_id: AssetId,
    pub location_id: LocationId,
    pub quantity_on_hand: i64,
    #[serde(default)]
    pub quantity_allocated: i64,
}

/// One step of moving a source asset's inventory onto a target asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryMove {
    /// Target already stocks this location: add quantities into `into`, then
    /// drop the source row `from`.
    Sum {
        into: i64,
        from: i64,
        on_hand: i64,
        allocated: i64,
    },
    /// Target has nothing at this location: re-key the source row.
    Rekey { inventory_id: i64 },
}

/// Decide how each source inventory row lands on the target asset.
///
/// Rows colliding on location are summed so total on-hand and allocated
/// quantity is conserved and the (asset, location) key stays unique.
pub fn plan_inventory_relink(
    source_rows: &[InventoryLevel],
    target_rows: &[InventoryLevel],
) -> Vec<InventoryMove> {
    let target_by_location: HashMap<LocationId, i64> = target_rows
        .iter()
        .map(|row| (row.location_id, row.inventory_id))
        .collect();

    source_rows
        .iter()
        .map(|row| match target_by_location.get(&row.location_id) {
            Some(&into) => InventoryMove::Sum {
                into,
                from: row.inventory_id,
                on_hand: row.quantity_on_hand,
                allocated: row.quantity_allocated,
            },
            None => InventoryMove::Rekey {
                inventory_id: row.inventory_id,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(inventory_id: i64, asset_id: AssetId, location_id: LocationId, on_hand: i64) -> InventoryLevel {
        InventoryLevel {
            inventory_id,
            asset_id,
            location_id,
            quantity_on_hand: on_hand,
            quantity_allocated: 1,
        }
    }

    #[test]
    fn colliding_locations_are_summed_others_rekeyed() {
        let source = vec![level(10, 2, 100, 4), level(11, 2, 200, 7)];
        let target = vec![level(20, 1, 100, 3)];

        let plan = plan_inventory_relink(&source, &target);
        assert_eq!(
            plan,
            vec![
                InventoryMove::Sum {
                    into: 20,
                    from: 10,
                    on_hand: 4,
                    allocated: 1
                },
                InventoryMove::Rekey { inventory_id: 11 },
            ]
        );
    }

    #[test]
    fn empty_source_plans_nothing() {
        assert!(plan_inventory_relink(&[], &[level(1, 1, 1, 1)]).is_empty());
    }

    #[test]
    fn dependent_kind_tables() {
        let tables: Vec<&str> = DependentKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(
            tables,
            vec!["transactions", "allocations", "request_items", "inventory_levels"]
        );
    }
}
