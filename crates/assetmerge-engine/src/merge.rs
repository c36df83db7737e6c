use assetmerge_core::{AssetRecord, FieldValue, MergeField};
use serde::Serialize;

/// Placed between a survivor's notes and the notes folded in from a loser.
pub const NOTES_SEPARATOR: &str = "\n\n--- Merged from duplicate ---\n";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub record: AssetRecord,
    /// Fields filled from the loser plus notes adopted or concatenated.
    pub fields_changed: usize,
}

/// Fold `loser` into a copy of `survivor`.
///
/// Blank survivor fields take the loser's value. Conflicting values stay as
/// they are on the survivor and the loser's value is recorded as an audit
/// line in the notes, so nothing the loser carried is lost.
pub fn merge(survivor: &AssetRecord, loser: &AssetRecord) -> MergeOutcome {
    let mut record = survivor.clone();
    let mut fields_changed = 0;
    let mut audit = Vec::new();

    for field in MergeField::ALL {
        if field == MergeField::Notes {
            continue;
        }
        match (survivor.field(field), loser.field(field)) {
            (None, Some(value)) => {
                record.set_field(field, value);
                fields_changed += 1;
            }
            (Some(kept), Some(lost)) if kept != lost => {
                audit.push(audit_line(field, &lost, &kept));
            }
            _ => {}
        }
    }

    let notes = match (survivor.field(MergeField::Notes), loser.field(MergeField::Notes)) {
        (None, Some(FieldValue::Text(theirs))) => {
            fields_changed += 1;
            Some(theirs)
        }
        (Some(FieldValue::Text(ours)), Some(FieldValue::Text(theirs))) if ours != theirs => {
            fields_changed += 1;
            Some(format!("{ours}{NOTES_SEPARATOR}{theirs}"))
        }
        _ => record.notes.clone(),
    };

    record.notes = if audit.is_empty() {
        notes
    } else {
        let audit = audit.join("\n");
        match notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(existing) => Some(format!("{existing}\n{audit}")),
            None => Some(audit),
        }
    };

    MergeOutcome {
        record,
        fields_changed,
    }
}

fn audit_line(field: MergeField, lost: &FieldValue, kept: &FieldValue) -> String {
    format!("Merged data: {field} was '{lost}' (kept: '{kept}')")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetmerge_core::AssetDate;
    use chrono::NaiveDate;

    #[test]
    fn blank_survivor_fields_are_filled() {
        let mut survivor = AssetRecord::new(1, "Drill");
        survivor.manufacturer = Some("Bosch".into());
        let mut loser = AssetRecord::new(2, "Drill");
        loser.serial_number = Some("SN123".into());
        loser.purchase_price = Some(149.99);
        loser.purchase_date = NaiveDate::from_ymd_opt(2021, 1, 4).map(AssetDate::from);

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.fields_changed, 3);
        assert_eq!(outcome.record.serial_number.as_deref(), Some("SN123"));
        assert_eq!(outcome.record.purchase_price, Some(149.99));
        assert_eq!(
            outcome.record.purchase_date,
            NaiveDate::from_ymd_opt(2021, 1, 4).map(AssetDate::from)
        );
        assert_eq!(outcome.record.manufacturer.as_deref(), Some("Bosch"));
        assert_eq!(outcome.record.notes, None);
    }

    #[test]
    fn conflicts_keep_survivor_and_leave_audit_line() {
        let mut survivor = AssetRecord::new(1, "Saw");
        survivor.model = Some("DCS570".into());
        survivor.notes = Some("Blade replaced".into());
        let mut loser = AssetRecord::new(2, "Saw");
        loser.model = Some("DCS565".into());

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.fields_changed, 0);
        assert_eq!(outcome.record.model.as_deref(), Some("DCS570"));
        assert_eq!(
            outcome.record.notes.as_deref(),
            Some("Blade replaced\nMerged data: model was 'DCS565' (kept: 'DCS570')")
        );
    }

    #[test]
    fn differing_notes_are_concatenated_before_audit() {
        let mut survivor = AssetRecord::new(1, "Van");
        survivor.notes = Some("Oil changed".into());
        survivor.current_value = Some(12000.0);
        let mut loser = AssetRecord::new(2, "Van");
        loser.notes = Some("New tyres".into());
        loser.current_value = Some(11500.0);

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.fields_changed, 1);
        assert_eq!(
            outcome.record.notes.as_deref(),
            Some(
                "Oil changed\n\n--- Merged from duplicate ---\nNew tyres\n\
                 Merged data: current_value was '11500' (kept: '12000')"
            )
        );
    }

    #[test]
    fn loser_notes_adopted_when_survivor_has_none() {
        let survivor = AssetRecord::new(1, "Van");
        let mut loser = AssetRecord::new(2, "Van");
        loser.notes = Some("Keys in office".into());

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.fields_changed, 1);
        assert_eq!(outcome.record.notes.as_deref(), Some("Keys in office"));
    }

    #[test]
    fn identical_values_change_nothing() {
        let mut survivor = AssetRecord::new(1, "Laptop");
        survivor.asset_tag = Some("IT-7".into());
        survivor.notes = Some("same".into());
        let mut loser = survivor.clone();
        loser.id = 2;

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.fields_changed, 0);
        assert_eq!(outcome.record, survivor);
    }

    #[test]
    fn null_placeholder_is_replaced_by_real_serial() {
        let mut survivor = AssetRecord::new(1, "Printer");
        survivor.serial_number = Some("null".into());
        let mut loser = AssetRecord::new(2, "Printer");
        loser.serial_number = Some("PR-55".into());

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.record.serial_number.as_deref(), Some("PR-55"));
        assert_eq!(outcome.record.notes, None);
    }

    #[test]
    fn loser_is_untouched_and_no_value_disappears() {
        let mut survivor = AssetRecord::new(1, "Generator");
        survivor.serial_number = Some("G-1".into());
        survivor.condition_status = Some("Good".into());
        let mut loser = AssetRecord::new(2, "Generator");
        loser.serial_number = Some("G-2".into());
        loser.condition_status = Some("Fair".into());
        loser.description = Some("Portable".into());
        let loser_before = loser.clone();

        let outcome = merge(&survivor, &loser);
        assert_eq!(loser, loser_before);

        let notes = outcome.record.notes.clone().unwrap_or_default();
        for field in MergeField::ALL {
            if let Some(value) = loser.field(field) {
                let kept = outcome.record.field(field);
                assert!(
                    kept.as_ref() == Some(&value) || notes.contains(&value.to_string()),
                    "{field} lost"
                );
            }
        }
    }

    #[test]
    fn money_conflicts_are_recorded_at_full_precision() {
        let mut survivor = AssetRecord::new(1, "Fuse");
        survivor.purchase_price = Some(0.004);
        survivor.current_value = Some(1234.5678);
        let mut loser = AssetRecord::new(2, "Fuse");
        loser.purchase_price = Some(0.001);
        loser.current_value = Some(1234.5612);

        let notes = merge(&survivor, &loser).record.notes.unwrap_or_default();
        assert!(notes.contains("purchase_price was '0.001' (kept: '0.004')"), "{notes}");
        assert!(notes.contains("current_value was '1234.5612' (kept: '1234.5678')"), "{notes}");
    }

    #[test]
    fn raw_date_text_is_kept_and_audited_verbatim() {
        let mut survivor = AssetRecord::new(1, "Ladder");
        survivor.purchase_date = Some(AssetDate::Raw("14/03/2021".into()));
        let mut loser = AssetRecord::new(2, "Ladder");
        loser.purchase_date = Some(AssetDate::Raw("15/03/2021".into()));
        loser.warranty_expiry = Some(AssetDate::Raw("03/2025".into()));

        let outcome = merge(&survivor, &loser);
        assert_eq!(outcome.record.purchase_date, survivor.purchase_date);
        assert_eq!(outcome.record.warranty_expiry, loser.warranty_expiry);
        assert_eq!(
            outcome.record.notes.as_deref(),
            Some("Merged data: purchase_date was '15/03/2021' (kept: '14/03/2021')")
        );
    }
}
