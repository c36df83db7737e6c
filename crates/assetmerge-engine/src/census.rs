use std::collections::{HashMap, HashSet};

use assetmerge_core::AssetRecord;
use serde::Serialize;

pub const DEFAULT_CENSUS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: usize,
}

/// How much duplication a record set carries, before any merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Census {
    pub total_assets: usize,
    pub unique_serials: usize,
    pub unique_tags: usize,
    pub unique_names: usize,
    pub duplicate_serials: Vec<KeyCount>,
    pub duplicate_tags: Vec<KeyCount>,
    /// Keyed `name / manufacturer / model`, blanks shown as `NULL`.
    pub duplicate_name_combos: Vec<KeyCount>,
}

pub fn census(records: &[AssetRecord], limit: usize) -> Census {
    let serials = tally(records.iter().filter_map(AssetRecord::serial_number_value));
    let tags = tally(records.iter().filter_map(AssetRecord::asset_tag_value));
    let combos = tally(records.iter().filter_map(|r| {
        let name = r.name_value()?;
        let manufacturer = r.manufacturer_value().unwrap_or("NULL");
        let model = r.model_value().unwrap_or("NULL");
        Some(format!("{name} / {manufacturer} / {model}"))
    }));
    let unique_names = records
        .iter()
        .filter_map(AssetRecord::name_value)
        .collect::<HashSet<_>>()
        .len();

    Census {
        total_assets: records.len(),
        unique_serials: serials.len(),
        unique_tags: tags.len(),
        unique_names,
        duplicate_serials: duplicates(serials, limit),
        duplicate_tags: duplicates(tags, limit),
        duplicate_name_combos: duplicates(combos, limit),
    }
}

fn tally<K, I>(keys: I) -> HashMap<String, usize>
where
    K: Into<String>,
    I: Iterator<Item = K>,
{
    let mut counts = HashMap::new();
    for key in keys {
        *counts.entry(key.into()).or_insert(0) += 1;
    }
    counts
}

fn duplicates(counts: HashMap<String, usize>, limit: usize) -> Vec<KeyCount> {
    let mut dups: Vec<KeyCount> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, count)| KeyCount { key, count })
        .collect();
    dups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    dups.truncate(limit);
    dups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: i64, name: &str, serial: Option<&str>, tag: Option<&str>) -> AssetRecord {
        let mut r = AssetRecord::new(id, name);
        r.serial_number = serial.map(str::to_string);
        r.asset_tag = tag.map(str::to_string);
        r
    }

    #[test]
    fn counts_duplicates_by_key() {
        let mut records = vec![
            asset(1, "Drill", Some("SN1"), Some("T1")),
            asset(2, "Drill", Some("SN1"), Some("T2")),
            asset(3, "Drill", Some("SN1"), None),
            asset(4, "Saw", Some("null"), Some("T2")),
            asset(5, "Saw", Some("null"), None),
            asset(6, "Van", Some("SN2"), None),
        ];
        records[0].manufacturer = Some("Bosch".into());

        let report = census(&records, DEFAULT_CENSUS_LIMIT);
        assert_eq!(report.total_assets, 6);
        assert_eq!(report.unique_serials, 2);
        assert_eq!(report.unique_tags, 2);
        assert_eq!(report.unique_names, 3);
        assert_eq!(
            report.duplicate_serials,
            vec![KeyCount {
                key: "SN1".into(),
                count: 3
            }]
        );
        assert_eq!(
            report.duplicate_tags,
            vec![KeyCount {
                key: "T2".into(),
                count: 2
            }]
        );
        assert_eq!(
            report.duplicate_name_combos,
            vec![
                KeyCount {
                    key: "Drill / NULL / NULL".into(),
                    count: 2
                },
                KeyCount {
                    key: "Saw / NULL / NULL".into(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn limit_truncates_lists() {
        let records: Vec<AssetRecord> = (0..10)
            .map(|i| asset(i, &format!("Item {}", i / 2), None, None))
            .collect();
        let report = census(&records, 3);
        assert_eq!(report.duplicate_name_combos.len(), 3);
        assert_eq!(report.duplicate_name_combos[0].key, "Item 0 / NULL / NULL");
    }
}
