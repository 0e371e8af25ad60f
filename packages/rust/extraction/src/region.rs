//! Region filter: suffix-tolerant bidirectional substring check.
//!
//! An item passes iff its prefecture is not the unknown sentinel AND
//! (the prefecture contains the region label, OR the region label contains
//! the prefecture with its trailing administrative suffix stripped).
//! This is a deliberate string-containment heuristic, not a geographic
//! hierarchy lookup. Reproduced as-is, by policy.

use leadscout_shared::UNKNOWN_PREFECTURE;

/// Trailing administrative suffixes stripped from a prefecture before the
/// reverse containment check (都/道/府/県).
const PREFECTURE_SUFFIXES: &[char] = &['都', '道', '府', '県'];

/// Does an extracted item's prefecture match the target region label?
pub fn matches_region(prefecture: &str, region: &str) -> bool {
    let prefecture = prefecture.trim();
    if prefecture.is_empty() || prefecture == UNKNOWN_PREFECTURE {
        return false;
    }

    prefecture.contains(region) || region.contains(strip_admin_suffix(prefecture))
}

/// Strip one trailing administrative suffix, if present.
fn strip_admin_suffix(prefecture: &str) -> &str {
    match prefecture.strip_suffix(PREFECTURE_SUFFIXES) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => prefecture,
    }
}
