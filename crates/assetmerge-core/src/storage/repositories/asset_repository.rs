use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::sync::MutexGuard;

use crate::error::{AssetError, Result};
use crate::models::{AssetDate, AssetId, AssetPatch, AssetRecord, FieldValue, NewAsset};

use super::Repository;

const ASSET_COLUMNS: &str = "asset_id, name, manufacturer, model, serial_number, asset_tag,
     description, notes, condition_status, purchase_date, purchase_price,
     current_value, warranty_expiry, created_at, updated_at";

pub trait AssetRepository: Repository<Entity = AssetRecord, Id = AssetId> {
    fn list_all(&self) -> Result<Vec<AssetRecord>>;
    fn insert(&self, asset: &NewAsset) -> Result<AssetId>;
    fn update_fields(&self, id: &AssetId, patch: &AssetPatch) -> Result<()>;
    fn count(&self) -> Result<usize>;
}

pub struct SqliteAssetRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteAssetRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AssetRecord> {
        Ok(AssetRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            manufacturer: row.get(2)?,
            model: row.get(3)?,
            serial_number: row.get(4)?,
            asset_tag: row.get(5)?,
            description: row.get(6)?,
            notes: row.get(7)?,
            condition_status: row.get(8)?,
            purchase_date: parse_date(row.get(9)?),
            purchase_price: row.get(10)?,
            current_value: row.get(11)?,
            warranty_expiry: parse_date(row.get(12)?),
            created_at: parse_timestamp(&row.get::<_, String>(13)?),
            updated_at: parse_timestamp(&row.get::<_, String>(14)?),
        })
    }
}

impl<'a> Repository for SqliteAssetRepository<'a> {
    type Entity = AssetRecord;
    type Id = AssetId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ASSET_COLUMNS} FROM assets WHERE asset_id = ?1"))?;
        let record = stmt.query_row(params![id], Self::row_to_record).optional()?;
        Ok(record)
    }

    /// Insert or update a full record, keeping its id.
    fn save(&self, record: &Self::Entity) -> Result<()> {
        self.conn.execute(
            "INSERT INTO assets
                (asset_id, name, manufacturer, model, serial_number, asset_tag,
                 description, notes, condition_status, purchase_date, purchase_price,
                 current_value, warranty_expiry, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(asset_id) DO UPDATE SET
                name = excluded.name,
                manufacturer = excluded.manufacturer,
                model = excluded.model,
                serial_number = excluded.serial_number,
                asset_tag = excluded.asset_tag,
                description = excluded.description,
                notes = excluded.notes,
                condition_status = excluded.condition_status,
                purchase_date = excluded.purchase_date,
                purchase_price = excluded.purchase_price,
                current_value = excluded.current_value,
                warranty_expiry = excluded.warranty_expiry,
                updated_at = excluded.updated_at",
            params![
                record.id,
                record.name,
                record.manufacturer,
                record.model,
                record.serial_number,
                record.asset_tag,
                record.description,
                record.notes,
                record.condition_status,
                format_date(&record.purchase_date),
                record.purchase_price,
                record.current_value,
                format_date(&record.warranty_expiry),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM assets WHERE asset_id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> AssetRepository for SqliteAssetRepository<'a> {
    fn list_all(&self) -> Result<Vec<AssetRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ASSET_COLUMNS} FROM assets ORDER BY asset_id"))?;
        let rows = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(&self, asset: &NewAsset) -> Result<AssetId> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO assets
                (name, manufacturer, model, serial_number, asset_tag, description, notes,
                 condition_status, purchase_date, purchase_price, current_value,
                 warranty_expiry, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                asset.name,
                asset.manufacturer,
                asset.model,
                asset.serial_number,
                asset.asset_tag,
                asset.description,
                asset.notes,
                asset.condition_status,
                format_date(&asset.purchase_date),
                asset.purchase_price,
                asset.current_value,
                format_date(&asset.warranty_expiry),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Write only the columns listed in `patch`; everything else keeps its
    /// stored text.
    fn update_fields(&self, id: &AssetId, patch: &AssetPatch) -> Result<()> {
        let mut values: Vec<Value> = Vec::with_capacity(patch.changes().len() + 2);
        let mut assignments = Vec::with_capacity(patch.changes().len() + 1);
        for (field, value) in patch.changes() {
            values.push(column_value(value.as_ref()));
            assignments.push(format!("{} = ?{}", field.column(), values.len()));
        }
        values.push(Value::Text(Utc::now().to_rfc3339()));
        assignments.push(format!("updated_at = ?{}", values.len()));
        values.push(Value::Integer(*id));

        let sql = format!(
            "UPDATE assets SET {} WHERE asset_id = ?{}",
            assignments.join(", "),
            values.len()
        );
        let updated = self.conn.execute(&sql, params_from_iter(values))?;
        if updated == 0 {
            return Err(AssetError::AssetNotFound(*id));
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn format_date(date: &Option<AssetDate>) -> Option<String> {
    date.as_ref().map(AssetDate::to_string)
}

fn parse_date(raw: Option<String>) -> Option<AssetDate> {
    AssetDate::parse(&raw?)
}

fn column_value(value: Option<&FieldValue>) -> Value {
    match value {
        Some(FieldValue::Text(text)) => Value::Text(text.clone()),
        Some(FieldValue::Date(date)) => Value::Text(date.to_string()),
        Some(FieldValue::Money(amount)) => Value::Real(*amount),
        None => Value::Null,
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MergeField;
    use crate::storage::database::{ConnectionPool, run_migrations};
    use chrono::NaiveDate;

    fn pool() -> ConnectionPool {
        let pool = ConnectionPool::open_in_memory().unwrap();
        run_migrations(&pool.get_connection()).unwrap();
        pool
    }

    #[test]
    fn insert_and_find() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let mut asset = NewAsset::named("Drill");
        asset.purchase_date = NaiveDate::from_ymd_opt(2022, 3, 14).map(AssetDate::from);
        asset.purchase_price = Some(199.0);

        let id = repo.insert(&asset).unwrap();
        let found = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(found.name.as_deref(), Some("Drill"));
        assert_eq!(
            found.purchase_date,
            NaiveDate::from_ymd_opt(2022, 3, 14).map(AssetDate::from)
        );
        assert_eq!(found.purchase_price, Some(199.0));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let first = repo.insert(&NewAsset::named("A")).unwrap();
        assert!(repo.delete(&first).unwrap());
        let second = repo.insert(&NewAsset::named("B")).unwrap();
        assert!(second > first);
    }

    #[test]
    fn update_fields_replaces_mergeable_columns() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let id = repo.insert(&NewAsset::named("Laptop")).unwrap();

        let patch = AssetPatch::default()
            .set(MergeField::SerialNumber, Some(FieldValue::Text("SN-9".into())))
            .set(MergeField::Notes, Some(FieldValue::Text("checked".into())));
        repo.update_fields(&id, &patch).unwrap();

        let found = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(found.serial_number.as_deref(), Some("SN-9"));
        assert_eq!(found.notes.as_deref(), Some("checked"));
        assert_eq!(found.name.as_deref(), Some("Laptop"));
    }

    #[test]
    fn update_missing_asset_is_not_found() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let err = repo.update_fields(&42, &AssetPatch::default()).unwrap_err();
        assert!(matches!(err, AssetError::AssetNotFound(42)));
    }

    #[test]
    fn save_upserts_by_id() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let id = repo.insert(&NewAsset::named("Old")).unwrap();
        let mut record = repo.find_by_id(&id).unwrap().unwrap();
        record.name = Some("New".into());
        repo.save(&record).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        let found = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(found.name.as_deref(), Some("New"));
    }

    #[test]
    fn legacy_date_text_survives_a_partial_update() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let id = repo.insert(&NewAsset::named("Ladder")).unwrap();
        repo.conn
            .execute(
                "UPDATE assets SET purchase_date = '14/03/2021',
                        warranty_expiry = '0000-00-00' WHERE asset_id = ?1",
                params![id],
            )
            .unwrap();

        let found = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(found.purchase_date, Some(AssetDate::Raw("14/03/2021".into())));
        assert_eq!(found.warranty_expiry, None);

        let patch =
            AssetPatch::default().set(MergeField::Description, Some(FieldValue::Text("Alloy".into())));
        repo.update_fields(&id, &patch).unwrap();

        let (purchase, warranty): (String, String) = repo
            .conn
            .query_row(
                "SELECT purchase_date, warranty_expiry FROM assets WHERE asset_id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(purchase, "14/03/2021");
        assert_eq!(warranty, "0000-00-00");
    }

    #[test]
    fn patch_can_clear_a_column() {
        let pool = pool();
        let repo = SqliteAssetRepository::new(pool.get_connection());
        let mut asset = NewAsset::named("Hose");
        asset.purchase_price = Some(12.125);
        let id = repo.insert(&asset).unwrap();

        repo.update_fields(&id, &AssetPatch::default().set(MergeField::PurchasePrice, None))
            .unwrap();
        assert_eq!(repo.find_by_id(&id).unwrap().unwrap().purchase_price, None);
    }
}
