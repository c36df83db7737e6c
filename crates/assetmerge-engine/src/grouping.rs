use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use assetmerge_core::{AssetId, AssetRecord, DedupConfig};
use serde::{Deserialize, Serialize};

use crate::error::{DedupError, Result};
use crate::normalize::normalize;

/// One way of deciding that two records describe the same asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStrategy {
    SerialNumber,
    AssetTag,
    NameManufacturerModel,
    /// Model blank on every member.
    NameManufacturer,
    /// Manufacturer and model blank on every member.
    NameOnly,
    /// Same normalized name, kept only when members differ in which of
    /// manufacturer, model and serial number they carry.
    NormalizedName,
}

impl GroupStrategy {
    pub const ALL: [GroupStrategy; 6] = [
        GroupStrategy::SerialNumber,
        GroupStrategy::AssetTag,
        GroupStrategy::NameManufacturerModel,
        GroupStrategy::NameManufacturer,
        GroupStrategy::NameOnly,
        GroupStrategy::NormalizedName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStrategy::SerialNumber => "serial_number",
            GroupStrategy::AssetTag => "asset_tag",
            GroupStrategy::NameManufacturerModel => "name_manufacturer_model",
            GroupStrategy::NameManufacturer => "name_manufacturer",
            GroupStrategy::NameOnly => "name_only",
            GroupStrategy::NormalizedName => "normalized_name",
        }
    }

    fn uses_name(&self) -> bool {
        !matches!(self, GroupStrategy::SerialNumber | GroupStrategy::AssetTag)
    }
}

impl fmt::Display for GroupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupStrategy {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self> {
        GroupStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim())
            .ok_or_else(|| DedupError::UnknownStrategy(s.to_string()))
    }
}

/// Records that one strategy considers the same asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub strategy: GroupStrategy,
    pub key: String,
    /// Ascending, at least two.
    pub member_ids: Vec<AssetId>,
}

#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    strategies: Vec<GroupStrategy>,
    ignored_names: HashSet<String>,
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self {
            strategies: GroupStrategy::ALL.to_vec(),
            ignored_names: HashSet::new(),
        }
    }
}

impl DuplicateFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DedupConfig) -> Result<Self> {
        let strategies = config
            .strategy_order
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<GroupStrategy>>>()?;
        Ok(Self::new()
            .with_strategies(strategies)
            .with_ignored_names(config.ignored_names.iter()))
    }

    /// Run order. A strategy left out is disabled.
    pub fn with_strategies(mut self, strategies: Vec<GroupStrategy>) -> Self {
        let mut seen = HashSet::new();
        self.strategies = strategies.into_iter().filter(|s| seen.insert(*s)).collect();
        self
    }

    /// Placeholder names (compared case-insensitively) that never act as a
    /// name-based grouping key.
    pub fn with_ignored_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_names = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        self
    }

    pub fn strategies(&self) -> &[GroupStrategy] {
        &self.strategies
    }

    /// Every group from every enabled strategy, in strategy order, each
    /// strategy's groups ordered by key.
    pub fn group(&self, records: &[AssetRecord]) -> Vec<DuplicateGroup> {
        self.strategies
            .iter()
            .flat_map(|strategy| self.find_by(*strategy, records))
            .collect()
    }

    pub fn find_by(&self, strategy: GroupStrategy, records: &[AssetRecord]) -> Vec<DuplicateGroup> {
        let mut buckets: BTreeMap<String, Vec<&AssetRecord>> = BTreeMap::new();
        for record in records {
            if strategy.uses_name() && self.is_ignored(record) {
                continue;
            }
            if let Some(key) = grouping_key(strategy, record) {
                buckets.entry(key).or_default().push(record);
            }
        }

        buckets
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .filter(|(_, members)| {
                strategy != GroupStrategy::NormalizedName || has_mixed_completeness(members)
            })
            .map(|(key, members)| {
                let mut member_ids: Vec<AssetId> = members.iter().map(|r| r.id).collect();
                member_ids.sort_unstable();
                DuplicateGroup {
                    strategy,
                    key,
                    member_ids,
                }
            })
            .collect()
    }

    fn is_ignored(&self, record: &AssetRecord) -> bool {
        record
            .name_value()
            .is_some_and(|name| self.ignored_names.contains(&name.to_lowercase()))
    }
}

fn grouping_key(strategy: GroupStrategy, record: &AssetRecord) -> Option<String> {
    let name = record.name_value();
    let manufacturer = record.manufacturer_value();
    let model = record.model_value();

    match strategy {
        GroupStrategy::SerialNumber => record.serial_number_value().map(str::to_string),
        GroupStrategy::AssetTag => record.asset_tag_value().map(str::to_string),
        GroupStrategy::NameManufacturerModel => match (name, manufacturer, model) {
            (Some(n), Some(m), Some(md)) => Some(format!("{n}|{m}|{md}")),
            _ => None,
        },
        GroupStrategy::NameManufacturer => match (name, manufacturer, model) {
            (Some(n), Some(m), None) => Some(format!("{n}|{m}")),
            _ => None,
        },
        GroupStrategy::NameOnly => match (name, manufacturer, model) {
            (Some(n), None, None) => Some(n.to_string()),
            _ => None,
        },
        GroupStrategy::NormalizedName => {
            name.map(normalize).filter(|normalized| !normalized.is_empty())
        }
    }
}

fn completeness_signature(record: &AssetRecord) -> (bool, bool, bool) {
    (
        record.manufacturer_value().is_some(),
        record.model_value().is_some(),
        record.serial_number_value().is_some(),
    )
}

fn has_mixed_completeness(members: &[&AssetRecord]) -> bool {
    let mut signatures = members.iter().map(|r| completeness_signature(r));
    match signatures.next() {
        Some(first) => signatures.any(|s| s != first),
        None => false,
    }
}
