//! PR title handling: noise-prefix stripping and the package-change grammar.
//!
//! Package-change titles come in two shapes:
//!
//! - `<pkgname>: <fromver> -> <tover>` for a version bump
//! - `<pkgname>: init at <ver>` for a newly added package
//!
//! Anything else is not a package-change PR and is ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Classification, PackageUpdate};

/// Leading tags such as `[WIP]` or `[staging]:`.
static BRACKET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]+\]:?").expect("invalid bracket prefix pattern"));

/// Bare keyword tags such as `wip:` or `Draft `.
static KEYWORD_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:wip|draft)(?::|\s|$)").expect("invalid keyword prefix pattern")
});

static UPDATE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([^:]+): (.*) -> ([^ ]+)").expect("invalid update title pattern")
});

static INIT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([^:]+): init at ([^ ]+)").expect("invalid init title pattern")
});

fn strip_one_prefix(title: &str) -> &str {
    if let Some(m) = BRACKET_PREFIX.find(title) {
        return &title[m.end()..];
    }
    if let Some(m) = KEYWORD_PREFIX.find(title) {
        return &title[m.end()..];
    }
    title
}

/// Removes noise prefixes and surrounding whitespace from a raw PR title.
///
/// Prefixes are stripped until none remain, so `[WIP] draft: foo` becomes
/// `foo` and normalizing twice gives the same result as normalizing once.
pub fn normalize(raw: &str) -> String {
    let mut title = raw.trim();

    loop {
        let stripped = strip_one_prefix(title).trim();
        if stripped.len() == title.len() {
            break;
        }
        title = stripped;
    }

    title.to_string()
}

fn match_update(title: &str) -> Option<PackageUpdate> {
    let caps = UPDATE_TITLE.captures(title)?;
    let name = caps.get(1)?.as_str().trim();
    let from_version = caps.get(2)?.as_str().trim();
    let to_version = caps.get(3)?.as_str();

    // An empty "from" would make this indistinguishable from an init.
    if name.is_empty() || from_version.is_empty() {
        return None;
    }

    Some(PackageUpdate::update(name, from_version, to_version))
}

fn match_init(title: &str) -> Option<PackageUpdate> {
    let caps = INIT_TITLE.captures(title)?;
    let name = caps.get(1)?.as_str().trim();
    let version = caps.get(2)?.as_str();

    if name.is_empty() {
        return None;
    }

    Some(PackageUpdate::init(name, version))
}

/// Classifies an already-normalized title.
///
/// The update grammar is tried first, so a title that somehow fits both
/// is reported as an update.
pub fn classify(title: &str) -> Classification {
    if let Some(info) = match_update(title) {
        return Classification::Update(info);
    }

    if let Some(info) = match_init(title) {
        return Classification::Init(info);
    }

    Classification::Unmatched
}
