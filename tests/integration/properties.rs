//! Property-based tests for routing, truncation and history

use cli_bridge::console::{classify, join_bounded, truncate_to, History, Route};
use proptest::prelude::*;

proptest! {
    #[test]
    fn history_retains_the_newest_entries(
        lines in proptest::collection::vec("[a-z ]{0,12}", 0..64),
        capacity in 0usize..16,
    ) {
        let mut history = History::new(capacity);
        for line in &lines {
            history.push(line.as_str());
        }
        let expected: Vec<&str> = lines
            .iter()
            .skip(lines.len().saturating_sub(capacity))
            .map(String::as_str)
            .collect();
        prop_assert!(history.len() <= capacity);
        prop_assert_eq!(history.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn classification_partitions_lines(line in "\\PC{0,40}") {
        match classify(&line, "esp ") {
            Route::Empty => prop_assert!(line.trim().is_empty()),
            Route::Local(rest) => {
                prop_assert!(line.starts_with("esp "));
                prop_assert_eq!(format!("esp {}", rest), line.clone());
            }
            Route::Worker(whole) => {
                prop_assert!(!line.starts_with("esp "));
                prop_assert_eq!(whole, line.as_str());
            }
        }
    }

    #[test]
    fn truncation_is_a_bounded_prefix(line in "\\PC{0,64}", max in 0usize..80) {
        let cut = truncate_to(&line, max);
        prop_assert!(cut.len() <= max);
        prop_assert!(line.starts_with(cut));
        if line.len() <= max {
            prop_assert_eq!(cut, line.as_str());
        }
    }

    #[test]
    fn bounded_join_is_a_prefix_of_the_full_join(
        parts in proptest::collection::vec("[a-z0-9:]{0,10}", 0..12),
        capacity in 0usize..48,
    ) {
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        let full = refs.join(" ");
        let bounded = join_bounded(&refs, capacity);
        prop_assert!(bounded.len() <= capacity);
        prop_assert!(full.starts_with(&bounded));
        if full.len() <= capacity {
            prop_assert_eq!(bounded, full);
        }
    }
}
