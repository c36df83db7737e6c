mod asset_repository;
mod dependent_repository;

pub use asset_repository::{AssetRepository, SqliteAssetRepository};
pub use dependent_repository::{
    DependentRepository, InventoryRepository, SqliteDependentRepository,
    SqliteInventoryRepository,
};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    fn save(&self, entity: &Self::Entity) -> Result<()>;
    fn delete(&self, id: &Self::Id) -> Result<bool>;
}
