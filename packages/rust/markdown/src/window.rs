//! Line-window selection: which lines of a file survive filtering.
//!
//! Selection and removal are two separate predicates. [`is_seed_match`]
//! decides which lines anchor a context window; [`is_removed`] is only
//! consulted at render time and never shrinks or grows the window.

use std::collections::BTreeSet;

use mdcc_shared::PatternList;

/// A line anchors a context window when there are no include patterns, or
/// when at least one include pattern matches it.
///
/// With no include patterns every line is a seed, so remove-only filtering
/// still walks the whole file.
pub fn is_seed_match(line: &str, include: &PatternList) -> bool {
    include.is_empty() || include.is_match(line)
}

/// A line is dropped from rendered output when any remove pattern matches it.
pub fn is_removed(line: &str, remove: &PatternList) -> bool {
    remove.is_match(line)
}

/// Select the 0-based line indices to emit, ascending and deduplicated.
///
/// Each seed match pulls in up to `before` preceding and `after` following
/// lines, clipped to the file. Returns an empty vector when nothing matches.
pub fn select_lines(
    lines: &[&str],
    include: &PatternList,
    before: usize,
    after: usize,
) -> Vec<usize> {
    let seeds: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_seed_match(line, include))
        .map(|(index, _)| index)
        .collect();

    if seeds.is_empty() {
        return Vec::new();
    }

    let last = lines.len() - 1;
    let mut selected = BTreeSet::new();
    for &index in &seeds {
        let start = index.saturating_sub(before);
        let end = index.saturating_add(after).min(last);
        selected.extend(start..=end);
    }

    selected.into_iter().collect()
}
