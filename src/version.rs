//! Version comparison between the reference tree and a PR's proposal.

use std::cmp::Ordering;

use semver::Version;

use crate::types::LocalVersion;

/// Parses a version string found in the wild, tolerating the common
/// shortcuts package sets use.
///
/// A leading `v` is dropped and a one- or two-component numeric core is
/// padded with zeros, so `v1.2` and `1.2-rc1` become `1.2.0` and
/// `1.2.0-rc1`. Returns `None` for anything that still isn't semver.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix('v')
        .or_else(|| raw.strip_prefix('V'))
        .unwrap_or(raw);

    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    let split_at = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split_at);

    let components: Vec<&str> = core.split('.').collect();
    if components.len() >= 3
        || components
            .iter()
            .any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = components.join(".");
    for _ in components.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded).ok()
}

/// Returns true when the reference tree already has `proposed` or newer.
///
/// Build metadata is ignored, as semver precedence requires. Unknown local
/// versions and unparseable strings on either side are never satisfied.
pub fn is_satisfied(local: &LocalVersion, proposed: &str) -> bool {
    let Some(local) = local.as_known() else {
        return false;
    };

    match (parse_lenient(local), parse_lenient(proposed)) {
        (Some(local), Some(proposed)) => local.cmp_precedence(&proposed) != Ordering::Less,
        _ => false,
    }
}
