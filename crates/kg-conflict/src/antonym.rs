//! Predicate pairs that can never both hold for the same subject — the
//! structural half of conflict detection (spec §4.4 "structural detection").

/// Order-independent antonym pairs. `is_antonym` checks both directions.
const ANTONYM_PAIRS: &[(&str, &str)] = &[
    ("increases", "decreases"),
    ("supports", "opposes"),
    ("acquired", "divested"),
    ("profitable", "unprofitable"),
    ("growing", "shrinking"),
    ("leads", "trails"),
    ("partners_with", "competes_with"),
];

pub fn is_antonym_pair(a: &str, b: &str) -> bool {
    ANTONYM_PAIRS.iter().any(|(x, y)| (x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b)) || (x.eq_ignore_ascii_case(b) && y.eq_ignore_ascii_case(a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_pair_either_direction() {
        assert!(is_antonym_pair("increases", "decreases"));
        assert!(is_antonym_pair("decreases", "increases"));
    }

    #[test]
    fn unrelated_predicates_are_not_antonyms() {
        assert!(!is_antonym_pair("increases", "partners_with"));
    }

    #[test]
    fn case_insensitive_match() {
        assert!(is_antonym_pair("Growing", "SHRINKING"));
    }
}
