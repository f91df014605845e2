//! Version ordering and base-version derivation.

use std::cmp::Ordering;

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Whether a version is a snapshot, either by explicit suffix or by carrying
/// a deploy timestamp qualifier (`1.0-20240315.101112-3`).
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX) || timestamped_base(version).is_some()
}

/// Derive the base version: timestamped snapshot qualifiers collapse back to
/// `-SNAPSHOT`, anything else is its own base version.
pub fn base_version(version: &str) -> String {
    match timestamped_base(version) {
        Some(base) => format!("{base}{SNAPSHOT_SUFFIX}"),
        None => version.to_string(),
    }
}

/// Match `<base>-<yyyymmdd.hhmmss>-<build>` and return the base part.
fn timestamped_base(version: &str) -> Option<&str> {
    let (rest, build) = version.rsplit_once('-')?;
    if build.is_empty() || !build.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (base, stamp) = rest.rsplit_once('-')?;
    let bytes = stamp.as_bytes();
    if bytes.len() != 15 || bytes[8] != b'.' {
        return None;
    }
    let digits_ok = bytes[..8].iter().chain(&bytes[9..]).all(u8::is_ascii_digit);
    if base.is_empty() || !digits_ok {
        return None;
    }
    Some(base)
}

#[derive(PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

/// Compare two version strings segment-wise.
///
/// Versions split on `.`, `-` and `_`. Numeric segments compare numerically,
/// textual segments case-insensitively. At a boundary a qualifier sorts below
/// an absent segment, which sorts below a number: `1.0-SNAPSHOT < 1.0 < 1.0.1`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<Segment<'_>> = segments(a).collect();
    let right: Vec<Segment<'_>> = segments(b).collect();
    let len = left.len().max(right.len());

    for i in 0..len {
        let ordering = match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) => compare_segments(l, r),
            (Some(l), None) => rank(l).cmp(&1),
            (None, Some(r)) => 1.cmp(&rank(r)),
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn segments(version: &str) -> impl Iterator<Item = Segment<'_>> {
    version
        .split(['.', '-', '_'])
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Text(s),
        })
}

fn compare_segments(l: &Segment<'_>, r: &Segment<'_>) -> Ordering {
    match (l, r) {
        (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
        (Segment::Text(a), Segment::Text(b)) => {
            a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase())
        }
        _ => rank(l).cmp(&rank(r)),
    }
}

// qualifier < absent < number
fn rank(segment: &Segment<'_>) -> u8 {
    match segment {
        Segment::Text(_) => 0,
        Segment::Number(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_version_of_release_is_itself() {
        assert_eq!(base_version("4.13.2"), "4.13.2");
        assert_eq!(base_version("1.0-SNAPSHOT"), "1.0-SNAPSHOT");
    }

    #[test]
    fn base_version_collapses_timestamp_qualifier() {
        assert_eq!(base_version("1.0-20240315.101112-3"), "1.0-SNAPSHOT");
        assert_eq!(base_version("2.1.0-20191201.235959-12"), "2.1.0-SNAPSHOT");
    }

    #[test]
    fn malformed_timestamps_are_not_snapshots() {
        assert_eq!(base_version("1.0-20240315-3"), "1.0-20240315-3");
        assert_eq!(base_version("1.0-2024x315.101112-3"), "1.0-2024x315.101112-3");
        assert!(!is_snapshot("1.0-20240315-3"));
        assert!(is_snapshot("1.0-20240315.101112-3"));
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "10.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn qualifier_sorts_below_release() {
        assert_eq!(compare_versions("1.0-SNAPSHOT", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0-alpha", "1.0-beta"), Ordering::Less);
    }
}
