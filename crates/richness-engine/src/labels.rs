use crate::combination::{dedup_labels, Label};

/// Parse a caller-supplied property list.
///
/// Accepts `P1,P2`, `[P1, P2]` and `["P1","P2"]`. Empty entries are dropped
/// and duplicates removed, keeping the first occurrence.
pub fn parse_property_list(raw: &str) -> Vec<Label> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    dedup_labels(
        inner
            .split(',')
            .map(|item| item.trim().trim_matches(|c| c == '"' || c == '\'').trim())
            .filter(|item| !item.is_empty()),
    )
}
