//! Substring scanning helpers for line-level match verification.

/// All starting offsets (zero-based, in characters) where `needle` occurs
/// in `haystack`, case-insensitively.
///
/// After a match the scan continues past the matched substring, so
/// occurrences do not overlap.
pub fn all_indices_of(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }

    let hay: Vec<char> = haystack.to_lowercase().chars().collect();
    let ndl: Vec<char> = needle.to_lowercase().chars().collect();

    let mut result = Vec::new();
    let mut offset = 0;
    while offset + ndl.len() <= hay.len() {
        if hay[offset..offset + ndl.len()] == ndl[..] {
            result.push(offset);
            offset += ndl.len();
        } else {
            offset += 1;
        }
    }
    result
}
