//! Ordering of dotted version strings.

use std::cmp::Ordering;

/// Version token that sorts above every concrete version.
pub const LATEST: &str = "latest";

const LATEST_NUMBER: u64 = 1_000_000_000;

/// Encodes a version as `major * 10^6 + minor * 10^3 + patch`.
///
/// Only the first three components count. Missing components and components
/// without leading digits become 0, so this never fails.
pub fn version_to_number(version: &str) -> u64 {
    if version.eq_ignore_ascii_case(LATEST) {
        return LATEST_NUMBER;
    }

    let mut parts = [0u64; 3];
    for (slot, part) in parts.iter_mut().zip(version.split('.')) {
        *slot = leading_number(part);
    }

    parts[0]
        .saturating_mul(1_000_000)
        .saturating_add(parts[1].saturating_mul(1_000))
        .saturating_add(parts[2])
}

/// Compares two versions by their numeric encoding.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    version_to_number(a).cmp(&version_to_number(b))
}

/// Sorts versions newest first.
pub fn sort_descending<S: AsRef<str>>(versions: &mut [S]) {
    versions.sort_by(|a, b| compare_versions(b.as_ref(), a.as_ref()));
}

fn leading_number(part: &str) -> u64 {
    let trimmed = part.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed, |end| &trimmed[..end]);
    digits.parse().unwrap_or(0)
}
