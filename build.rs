//! Build script for prdups: embeds a human-readable version string.
//!
//! The string is `<pkg-version> (<git-version>) <rustc-version>`, where the
//! git part is `git describe --tags --always --dirty` when a tag exists and
//! otherwise a pseudo-version `v<pkg-version>-<timestamp>-<commit>[+dirty]`.
//! Clean trees use the commit time, dirty trees and builds outside git use
//! the build time.

use std::process::Command;

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `None` outside a git checkout. `.cargo-ok` from `cargo install --git`
/// does not count as a change.
fn is_dirty() -> Option<bool> {
    run("git", &["status", "--porcelain"]).map(|status| {
        status
            .lines()
            .any(|line| line.get(3..).is_some_and(|path| path != ".cargo-ok"))
    })
}

fn pseudo_version() -> String {
    let commit = run("git", &["rev-parse", "--short=12", "HEAD"])
        .unwrap_or_else(|| "unknown".to_string());
    let dirty = is_dirty();

    let commit_time = match dirty {
        Some(false) => run("git", &["log", "-1", "--format=%ct"])
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };
    let timestamp = commit_time.unwrap_or_else(Utc::now).format(TIMESTAMP_FORMAT);

    let suffix = if dirty == Some(true) { "+dirty" } else { "" };
    let version = env!("CARGO_PKG_VERSION");

    format!("v{version}-{timestamp}-{commit}{suffix}")
}

fn git_version() -> String {
    match run("git", &["describe", "--tags", "--always", "--dirty"]) {
        // A bare hash means there are no tags to describe from.
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn build_info() -> String {
    [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        Some(format!("({})", git_version())),
        run("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}
