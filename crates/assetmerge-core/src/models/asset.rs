use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned asset identifier. Never reused once assigned.
pub type AssetId = i64;

/// Serial number value some legacy sources wrote instead of leaving it empty.
pub const SERIAL_PLACEHOLDER: &str = "null";

/// The unit of deduplication: one row of the canonical asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: AssetId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<AssetDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty_expiry: Option<AssetDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssetRecord {
    pub fn new(id: AssetId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: Some(name.into()),
            manufacturer: None,
            model: None,
            serial_number: None,
            asset_tag: None,
            description: None,
            notes: None,
            condition_status: None,
            purchase_date: None,
            purchase_price: None,
            current_value: None,
            warranty_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Trimmed name, `None` when blank.
    pub fn name_value(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn manufacturer_value(&self) -> Option<&str> {
        non_blank(&self.manufacturer)
    }

    pub fn model_value(&self) -> Option<&str> {
        non_blank(&self.model)
    }

    /// Trimmed serial number; blank and the `"null"` placeholder yield `None`.
    pub fn serial_number_value(&self) -> Option<&str> {
        non_blank(&self.serial_number).filter(|s| !s.eq_ignore_ascii_case(SERIAL_PLACEHOLDER))
    }

    pub fn asset_tag_value(&self) -> Option<&str> {
        non_blank(&self.asset_tag)
    }

    /// Read one mergeable field. Blank values come back as `None`.
    pub fn field(&self, field: MergeField) -> Option<FieldValue> {
        let text = |value: Option<&str>| value.map(|s| FieldValue::Text(s.to_string()));
        match field {
            MergeField::Description => text(non_blank(&self.description)),
            MergeField::SerialNumber => text(self.serial_number_value()),
            MergeField::Manufacturer => text(self.manufacturer_value()),
            MergeField::Model => text(self.model_value()),
            MergeField::PurchaseDate => self.purchase_date.clone().map(FieldValue::Date),
            MergeField::PurchasePrice => non_zero(self.purchase_price).map(FieldValue::Money),
            MergeField::CurrentValue => non_zero(self.current_value).map(FieldValue::Money),
            MergeField::WarrantyExpiry => self.warranty_expiry.clone().map(FieldValue::Date),
            MergeField::AssetTag => text(self.asset_tag_value()),
            MergeField::Notes => text(non_blank(&self.notes)),
            MergeField::ConditionStatus => text(non_blank(&self.condition_status)),
        }
    }

    /// The column value exactly as held, without trimming or blank rules.
    pub fn stored(&self, field: MergeField) -> Option<FieldValue> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
        match field {
            MergeField::Description => text(&self.description),
            MergeField::SerialNumber => text(&self.serial_number),
            MergeField::Manufacturer => text(&self.manufacturer),
            MergeField::Model => text(&self.model),
            MergeField::PurchaseDate => self.purchase_date.clone().map(FieldValue::Date),
            MergeField::PurchasePrice => self.purchase_price.map(FieldValue::Money),
            MergeField::CurrentValue => self.current_value.map(FieldValue::Money),
            MergeField::WarrantyExpiry => self.warranty_expiry.clone().map(FieldValue::Date),
            MergeField::AssetTag => text(&self.asset_tag),
            MergeField::Notes => text(&self.notes),
            MergeField::ConditionStatus => text(&self.condition_status),
        }
    }

    /// Overwrite one mergeable field. A value of the wrong kind for the field
    /// is ignored.
    pub fn set_field(&mut self, field: MergeField, value: FieldValue) {
        match (field, value) {
            (MergeField::Description, FieldValue::Text(s)) => self.description = Some(s),
            (MergeField::SerialNumber, FieldValue::Text(s)) => self.serial_number = Some(s),
            (MergeField::Manufacturer, FieldValue::Text(s)) => self.manufacturer = Some(s),
            (MergeField::Model, FieldValue::Text(s)) => self.model = Some(s),
            (MergeField::PurchaseDate, FieldValue::Date(d)) => self.purchase_date = Some(d),
            (MergeField::PurchasePrice, FieldValue::Money(m)) => self.purchase_price = Some(m),
            (MergeField::CurrentValue, FieldValue::Money(m)) => self.current_value = Some(m),
            (MergeField::WarrantyExpiry, FieldValue::Date(d)) => self.warranty_expiry = Some(d),
            (MergeField::AssetTag, FieldValue::Text(s)) => self.asset_tag = Some(s),
            (MergeField::Notes, FieldValue::Text(s)) => self.notes = Some(s),
            (MergeField::ConditionStatus, FieldValue::Text(s)) => self.condition_status = Some(s),
            _ => {}
        }
    }
}

/// The fixed list of fields the merger folds from losers into a survivor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeField {
    Description,
    SerialNumber,
    Manufacturer,
    Model,
    PurchaseDate,
    PurchasePrice,
    CurrentValue,
    WarrantyExpiry,
    AssetTag,
    Notes,
    ConditionStatus,
}

impl MergeField {
    pub const ALL: [MergeField; 11] = [
        MergeField::Description,
        MergeField::SerialNumber,
        MergeField::Manufacturer,
        MergeField::Model,
        MergeField::PurchaseDate,
        MergeField::PurchasePrice,
        MergeField::CurrentValue,
        MergeField::WarrantyExpiry,
        MergeField::AssetTag,
        MergeField::Notes,
        MergeField::ConditionStatus,
    ];

    /// Column name in the `assets` table.
    pub fn column(&self) -> &'static str {
        match self {
            MergeField::Description => "description",
            MergeField::SerialNumber => "serial_number",
            MergeField::Manufacturer => "manufacturer",
            MergeField::Model => "model",
            MergeField::PurchaseDate => "purchase_date",
            MergeField::PurchasePrice => "purchase_price",
            MergeField::CurrentValue => "current_value",
            MergeField::WarrantyExpiry => "warranty_expiry",
            MergeField::AssetTag => "asset_tag",
            MergeField::Notes => "notes",
            MergeField::ConditionStatus => "condition_status",
        }
    }
}

impl fmt::Display for MergeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A date column. Text that is not a plain `YYYY-MM-DD` date is kept verbatim
/// so writing it back never alters what an import left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetDate {
    Day(NaiveDate),
    Raw(String),
}

impl AssetDate {
    const FORMAT: &'static str = "%Y-%m-%d";

    /// Read stored date text. Blank text and the `0000-00-00` zero date are absent.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "0000-00-00" {
            return None;
        }
        match NaiveDate::parse_from_str(raw, Self::FORMAT) {
            Ok(day) if day.format(Self::FORMAT).to_string() == raw => Some(AssetDate::Day(day)),
            _ => Some(AssetDate::Raw(raw.to_string())),
        }
    }
}

impl From<NaiveDate> for AssetDate {
    fn from(day: NaiveDate) -> Self {
        AssetDate::Day(day)
    }
}

impl fmt::Display for AssetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetDate::Day(day) => write!(f, "{}", day.format(Self::FORMAT)),
            AssetDate::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A non-blank value of one mergeable field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(AssetDate),
    Money(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{d}"),
            FieldValue::Money(m) => write!(f, "{m}"),
        }
    }
}

/// Insert shape for a new asset; the store assigns id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAsset {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub asset_tag: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub condition_status: Option<String>,
    pub purchase_date: Option<AssetDate>,
    pub purchase_price: Option<f64>,
    pub current_value: Option<f64>,
    pub warranty_expiry: Option<AssetDate>,
}

impl NewAsset {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Column updates for one asset. Only the listed fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPatch {
    changes: Vec<(MergeField, Option<FieldValue>)>,
}

impl AssetPatch {
    /// Set `field` to `value`, replacing an earlier entry for the same field.
    pub fn set(mut self, field: MergeField, value: Option<FieldValue>) -> Self {
        self.changes.retain(|(f, _)| *f != field);
        self.changes.push((field, value));
        self
    }

    /// The columns whose stored value differs between `before` and `after`.
    pub fn between(before: &AssetRecord, after: &AssetRecord) -> Self {
        let changes = MergeField::ALL
            .into_iter()
            .filter_map(|field| {
                let value = after.stored(field);
                (before.stored(field) != value).then_some((field, value))
            })
            .collect();
        Self { changes }
    }

    pub fn changes(&self) -> &[(MergeField, Option<FieldValue>)] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}
