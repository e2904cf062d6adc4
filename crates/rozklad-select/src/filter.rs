#![forbid(unsafe_code)]

//! Case-insensitive substring filtering over option sets.
//!
//! An option matches when any of its configured [`SearchKey`]s contains the
//! query as a substring after case folding. The empty query matches
//! everything.
//!
//! Case folding is per character (no context-sensitive rules), which keeps
//! filtering monotone: if `q2` extends `q1`, every match of `q2` is also a
//! match of `q1`. [`IncrementalFilter`] relies on this to re-scan only the
//! previous result set when the query grows.

use crate::option::{SearchKey, SelectOption};

/// Fold a string for case-insensitive comparison.
#[must_use]
pub fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Whether `option` matches an already case-folded, non-empty query.
fn matches_folded(option: &SelectOption, folded_query: &str, keys: &[SearchKey]) -> bool {
    keys.iter().any(|key| {
        option
            .search_text(key)
            .is_some_and(|text| fold_case(&text).contains(folded_query))
    })
}

/// Whether `option` matches `query` on any of `keys`.
#[must_use]
pub fn matches(option: &SelectOption, query: &str, keys: &[SearchKey]) -> bool {
    if query.is_empty() {
        return true;
    }
    matches_folded(option, &fold_case(query), keys)
}

/// Indices of the options matching `query`, in source order.
#[must_use]
pub fn filter_indices(options: &[SelectOption], query: &str, keys: &[SearchKey]) -> Vec<usize> {
    if query.is_empty() {
        return (0..options.len()).collect();
    }
    let folded = fold_case(query);
    options
        .iter()
        .enumerate()
        .filter(|(_, opt)| matches_folded(opt, &folded, keys))
        .map(|(i, _)| i)
        .collect()
}

/// Statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Full scans over the whole option set.
    pub full_scans: u64,
    /// Scans restricted to the previous result set.
    pub incremental_scans: u64,
}

/// Filter that reuses the previous result when the query is extended.
///
/// The caller bumps the corpus generation whenever the option set changes;
/// a generation mismatch forces a full scan.
#[derive(Debug, Clone, Default)]
pub struct IncrementalFilter {
    last_query: Option<String>,
    last_generation: u64,
    last_result: Vec<usize>,
    stats: FilterStats,
}

impl IncrementalFilter {
    /// Create an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached results.
    pub fn invalidate(&mut self) {
        self.last_query = None;
        self.last_result.clear();
    }

    /// Scan statistics.
    #[must_use]
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Matching indices for `query` over `options`.
    pub fn filter(
        &mut self,
        options: &[SelectOption],
        query: &str,
        keys: &[SearchKey],
        generation: u64,
    ) -> &[usize] {
        let folded = fold_case(query);
        let can_narrow = generation == self.last_generation
            && self
                .last_query
                .as_deref()
                .is_some_and(|prev| folded.starts_with(prev));

        if can_narrow {
            if self.last_query.as_deref() != Some(folded.as_str()) {
                self.stats.incremental_scans += 1;
                self.last_result
                    .retain(|&i| options.get(i).is_some_and(|o| matches_folded(o, &folded, keys)));
            }
        } else {
            self.stats.full_scans += 1;
            self.last_result = if folded.is_empty() {
                (0..options.len()).collect()
            } else {
                options
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| matches_folded(o, &folded, keys))
                    .map(|(i, _)| i)
                    .collect()
            };
        }

        self.last_generation = generation;
        self.last_query = Some(folded);
        &self.last_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rooms() -> Vec<SelectOption> {
        vec![
            SelectOption::new(1, "Lecture Hall A").with_raw(json!({"corp": "Main"})),
            SelectOption::new(2, "Lab 204").with_raw(json!({"corp": "North"})),
            SelectOption::new(3, "lecture hall b").with_raw(json!({"corp": "North"})),
        ]
    }

    #[test]
    fn empty_query_returns_all() {
        assert_eq!(filter_indices(&rooms(), "", &[SearchKey::Label]), vec![0, 1, 2]);
    }

    #[test]
    fn case_insensitive_substring() {
        assert_eq!(
            filter_indices(&rooms(), "HALL", &[SearchKey::Label]),
            vec![0, 2]
        );
        assert_eq!(filter_indices(&rooms(), "20", &[SearchKey::Label]), vec![1]);
    }

    #[test]
    fn any_configured_key_may_match() {
        let keys = [SearchKey::Label, SearchKey::Field("corp".into())];
        assert_eq!(filter_indices(&rooms(), "north", &keys), vec![1, 2]);
        assert!(filter_indices(&rooms(), "north", &[SearchKey::Label]).is_empty());
    }

    #[test]
    fn id_key_matches_string_form() {
        assert_eq!(filter_indices(&rooms(), "3", &[SearchKey::Id]), vec![2]);
    }

    #[test]
    fn no_keys_matches_nothing_for_non_empty_query() {
        assert!(!matches(&rooms()[0], "a", &[]));
        assert!(matches(&rooms()[0], "", &[]));
    }

    #[test]
    fn fold_case_is_per_character() {
        assert_eq!(fold_case("ÀБc"), "àбc");
        // Context-free: a trailing sigma folds the same as any other.
        assert_eq!(fold_case("ΟΣ"), "οσ");
    }

    #[test]
    fn incremental_narrows_on_extension() {
        let opts = rooms();
        let keys = [SearchKey::Label];
        let mut f = IncrementalFilter::new();
        assert_eq!(f.filter(&opts, "l", &keys, 0), &[0, 1, 2]);
        assert_eq!(f.filter(&opts, "le", &keys, 0), &[0, 2]);
        assert_eq!(f.filter(&opts, "lec", &keys, 0), &[0, 2]);
        assert_eq!(f.stats().full_scans, 1);
        assert_eq!(f.stats().incremental_scans, 2);
    }

    #[test]
    fn incremental_rescans_on_shrink_or_generation() {
        let opts = rooms();
        let keys = [SearchKey::Label];
        let mut f = IncrementalFilter::new();
        f.filter(&opts, "lab", &keys, 0);
        assert_eq!(f.filter(&opts, "la", &keys, 0), &[1]);
        assert_eq!(f.stats().full_scans, 2);

        let fewer = &opts[..2];
        assert_eq!(f.filter(fewer, "la", &keys, 1), &[1]);
        assert_eq!(f.stats().full_scans, 3);
    }

    #[test]
    fn incremental_matches_full_scan() {
        let opts = rooms();
        let keys = [SearchKey::Label, SearchKey::Field("corp".into())];
        let mut f = IncrementalFilter::new();
        for q in ["", "n", "no", "nor", "nort", "north"] {
            let expected = filter_indices(&opts, q, &keys);
            assert_eq!(f.filter(&opts, q, &keys, 7), expected.as_slice(), "query {q:?}");
        }
    }
}
