//! Near-miss names the exact strategies cannot group. Report only.

use assetmerge_core::{AssetId, AssetRecord};
use serde::Serialize;

use crate::normalize::normalize;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPair {
    pub left_id: AssetId,
    pub left_name: String,
    pub right_id: AssetId,
    pub right_name: String,
    pub similarity: f64,
}

/// Normalized Levenshtein similarity of two names in `[0, 1]`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    similarity_of_normalized(&normalize(a), &normalize(b))
}

fn similarity_of_normalized(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Pairs of records whose names differ after normalization but are at least
/// `threshold` similar, most similar first.
pub fn find_similar(records: &[AssetRecord], threshold: f64) -> Vec<SimilarPair> {
    let threshold = threshold.clamp(0.0, 1.0);
    let named: Vec<(&AssetRecord, &str, String)> = records
        .iter()
        .filter_map(|record| {
            let name = record.name_value()?;
            let normalized = normalize(name);
            (!normalized.is_empty()).then_some((record, name, normalized))
        })
        .collect();

    let mut pairs = Vec::new();
    for (i, (left, left_name, left_norm)) in named.iter().enumerate() {
        for (right, right_name, right_norm) in &named[i + 1..] {
            if left_norm == right_norm {
                continue;
            }
            let similarity = similarity_of_normalized(left_norm, right_norm);
            if similarity >= threshold {
                let (first, second) = if left.id <= right.id {
                    ((left, left_name), (right, right_name))
                } else {
                    ((right, right_name), (left, left_name))
                };
                pairs.push(SimilarPair {
                    left_id: first.0.id,
                    left_name: first.1.to_string(),
                    right_id: second.0.id,
                    right_name: second.1.to_string(),
                    similarity,
                });
            }
        }
    }

    pairs.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.left_id.cmp(&b.left_id))
            .then_with(|| a.right_id.cmp(&b.right_id))
    });
    pairs
}
