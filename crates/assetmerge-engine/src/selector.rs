use assetmerge_core::{AssetRecord, ScoreWeights};

use crate::scoring::score_with;

/// Highest-scoring record under the default weights; ties go to the lowest id.
pub fn select(records: &[AssetRecord]) -> Option<&AssetRecord> {
    select_with(records, &ScoreWeights::default())
}

pub fn select_with<'a>(records: &'a [AssetRecord], weights: &ScoreWeights) -> Option<&'a AssetRecord> {
    records
        .iter()
        .map(|record| (score_with(record, weights), record))
        .max_by(|(left_score, left), (right_score, right)| {
            left_score
                .cmp(right_score)
                .then_with(|| right.id.cmp(&left.id))
        })
        .map(|(_, record)| record)
}
