use assetmerge_core::{AssetRecord, MergeField, ScoreWeights};

/// Completeness score under the default weights.
pub fn score(record: &AssetRecord) -> u32 {
    score_with(record, &ScoreWeights::default())
}

pub fn score_with(record: &AssetRecord, weights: &ScoreWeights) -> u32 {
    let present = |field: MergeField| record.field(field).is_some();
    let positive = |value: Option<f64>| value.is_some_and(|v| v > 0.0);

    let mut score = 0;
    if present(MergeField::SerialNumber) {
        score += weights.serial_number;
    }
    if present(MergeField::AssetTag) {
        score += weights.asset_tag;
    }
    if present(MergeField::Manufacturer) {
        score += weights.manufacturer;
    }
    if present(MergeField::Model) {
        score += weights.model;
    }
    if positive(record.purchase_price) {
        score += weights.purchase_price;
    }
    if positive(record.current_value) {
        score += weights.current_value;
    }
    if present(MergeField::Description) {
        score += weights.description;
    }
    if present(MergeField::PurchaseDate) {
        score += weights.purchase_date;
    }
    if present(MergeField::WarrantyExpiry) {
        score += weights.warranty_expiry;
    }
    if present(MergeField::Notes) {
        score += weights.notes;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_record_scores_zero() {
        assert_eq!(score(&AssetRecord::new(1, "Bare")), 0);
    }

    #[test]
    fn fully_populated_record_scores_every_weight() {
        let mut r = AssetRecord::new(1, "Generator");
        r.serial_number = Some("G-1".into());
        r.asset_tag = Some("T-1".into());
        r.manufacturer = Some("Honda".into());
        r.model = Some("EU22i".into());
        r.purchase_price = Some(1100.0);
        r.current_value = Some(800.0);
        r.description = Some("Inverter generator".into());
        r.purchase_date = NaiveDate::from_ymd_opt(2020, 5, 1).map(Into::into);
        r.warranty_expiry = NaiveDate::from_ymd_opt(2023, 5, 1).map(Into::into);
        r.notes = Some("Service yearly".into());

        assert_eq!(score(&r), 10 + 8 + 5 + 5 + 5 + 3 + 2 + 2 + 2 + 1);
    }

    #[test]
    fn placeholders_and_non_positive_amounts_score_nothing() {
        let mut r = AssetRecord::new(1, "Radio");
        r.serial_number = Some("NULL".into());
        r.asset_tag = Some("   ".into());
        r.purchase_price = Some(0.0);
        r.current_value = Some(-5.0);
        assert_eq!(score(&r), 0);
    }

    #[test]
    fn custom_weights_apply() {
        let mut r = AssetRecord::new(1, "Radio");
        r.notes = Some("spare".into());
        let weights = ScoreWeights {
            notes: 7,
            ..ScoreWeights::default()
        };
        assert_eq!(score_with(&r, &weights), 7);
    }
}
