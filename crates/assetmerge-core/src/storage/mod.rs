pub mod database;
pub mod repositories;

use crate::error::{AssetError, Result};
use crate::models::{AssetId, AssetPatch, AssetRecord, DependentKind};

/// What a deduplication pass needs from the place assets live.
pub trait AssetStore {
    /// Fail with a fatal error unless the asset table and every dependent
    /// table are present.
    fn verify_schema(&self) -> Result<()>;

    /// Every asset, ordered by id.
    fn list_all(&self) -> Result<Vec<AssetRecord>>;

    fn get_by_id(&self, id: AssetId) -> Result<Option<AssetRecord>>;

    /// Write the columns listed in `patch`. `AssetNotFound` if absent.
    fn update_fields(&self, id: AssetId, patch: &AssetPatch) -> Result<()>;

    fn delete_by_id(&self, id: AssetId) -> Result<bool>;

    /// Point every `kind` row owned by `from` at `to`; returns rows touched.
    fn relink_dependents(&self, from: AssetId, to: AssetId, kind: DependentKind)
    -> Result<usize>;

    /// Run `work` atomically: commit on `Ok`, roll back on `Err`.
    fn with_transaction<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<AssetError>;
}
