//! Canonical form of names for fuzzy grouping and similarity.

/// Lowercase, drop everything outside `[a-z0-9 ]`, collapse whitespace runs
/// and trim. Shared by normalized-name grouping and the similarity report.
pub fn normalize(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("  Impact   Wrench "), "impact wrench");
        assert_eq!(normalize("Drill-Bit Set (10pc)"), "drillbit set 10pc");
        assert_eq!(normalize("Ladder\t 6ft"), "ladder 6ft");
    }

    #[test]
    fn normalize_is_total() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("#!@"), "");
        assert_eq!(normalize("Café"), "caf");
    }

    #[test]
    fn collapse_happens_after_stripping() {
        assert_eq!(normalize("Saw - Circular"), "saw circular");
    }
}
